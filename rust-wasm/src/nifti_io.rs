//! NIfTI file I/O
//!
//! Loads target magnetization maps and saves designed excitation patterns.
//! Works on byte arrays so it can be used from WebAssembly, where
//! filesystem access is not available; `load_nifti_file` covers native use.

use std::io::Cursor;
use std::path::Path;

use flate2::read::GzDecoder;
use ndarray::Array;
use nifti::volume::ndarray::IntoNdArray;
use nifti::{InMemNiftiObject, NiftiHeader, NiftiObject};

use crate::error::{PtxError, Result};

/// NIfTI data loaded from bytes
pub struct NiftiData {
    /// Volume data as f64, x varies fastest
    pub data: Vec<f64>,
    /// Dimensions (nx, ny, nz); 2D images have nz = 1
    pub dims: (usize, usize, usize),
    /// Voxel sizes in mm
    pub voxel_size: (f64, f64, f64),
    /// Affine transformation matrix (4x4, row-major)
    pub affine: [f64; 16],
}

/// Check if bytes are gzip compressed
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Load a NIfTI file from bytes
///
/// Supports both .nii and .nii.gz files (gzip is auto-detected).
/// 2D images are returned with nz = 1; for 4D data the first volume is used.
pub fn load_nifti(bytes: &[u8]) -> Result<NiftiData> {
    let obj: InMemNiftiObject = if is_gzip(bytes) {
        InMemNiftiObject::from_reader(GzDecoder::new(Cursor::new(bytes)))
            .map_err(|e| PtxError::Nifti(format!("failed to read gzipped NIfTI: {}", e)))?
    } else {
        InMemNiftiObject::from_reader(Cursor::new(bytes))
            .map_err(|e| PtxError::Nifti(format!("failed to read NIfTI: {}", e)))?
    };

    let header = obj.header();
    let pixdim = header.pixdim;
    let voxel_size = (pixdim[1] as f64, pixdim[2] as f64, pixdim[3] as f64);
    let affine = get_affine(header);

    let array: Array<f64, _> = obj.into_volume().into_ndarray()
        .map_err(|e| PtxError::Nifti(format!("failed to convert to ndarray: {}", e)))?;

    let shape = array.shape().to_vec();
    if shape.len() < 2 || shape.len() > 4 {
        return Err(PtxError::Nifti(format!("expected a 2D, 3D or 4D image, got {}D", shape.len())));
    }
    let dim0 = shape[0];
    let dim1 = shape[1];
    let dim2 = if shape.len() >= 3 { shape[2] } else { 1 };

    // Fortran order: index = x + y*nx + z*nx*ny
    let mut data = Vec::with_capacity(dim0 * dim1 * dim2);
    for k in 0..dim2 {
        for j in 0..dim1 {
            for i in 0..dim0 {
                let v = match shape.len() {
                    2 => array[[i, j]],
                    3 => array[[i, j, k]],
                    _ => array[[i, j, k, 0]],
                };
                data.push(v);
            }
        }
    }

    Ok(NiftiData {
        data,
        dims: (dim0, dim1, dim2),
        voxel_size,
        affine,
    })
}

/// Read and parse a NIfTI file from disk
pub fn load_nifti_file(path: impl AsRef<Path>) -> Result<NiftiData> {
    let bytes = std::fs::read(path.as_ref())?;
    load_nifti(&bytes)
}

/// Get affine transformation matrix from header
fn get_affine(header: &NiftiHeader) -> [f64; 16] {
    // Prefer sform if available (sform_code > 0)
    if header.sform_code > 0 {
        let s = &header.srow_x;
        let t = &header.srow_y;
        let u = &header.srow_z;
        [
            s[0] as f64, s[1] as f64, s[2] as f64, s[3] as f64,
            t[0] as f64, t[1] as f64, t[2] as f64, t[3] as f64,
            u[0] as f64, u[1] as f64, u[2] as f64, u[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        ]
    } else {
        identity_affine((header.pixdim[1] as f64, header.pixdim[2] as f64, header.pixdim[3] as f64))
    }
}

/// Diagonal affine with the given voxel sizes
pub fn identity_affine(voxel_size: (f64, f64, f64)) -> [f64; 16] {
    let (vsx, vsy, vsz) = voxel_size;
    [
        vsx, 0.0, 0.0, 0.0,
        0.0, vsy, 0.0, 0.0,
        0.0, 0.0, vsz, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ]
}

/// Save data as NIfTI bytes
///
/// Writes an uncompressed single-file .nii with float32 voxels.
pub fn save_nifti(
    data: &[f64],
    dims: (usize, usize, usize),
    voxel_size: (f64, f64, f64),
    affine: &[f64; 16],
) -> Result<Vec<u8>> {
    let (nx, ny, nz) = dims;
    let (vsx, vsy, vsz) = voxel_size;

    if data.len() != PtxError::checked_size("dims", &[nx, ny, nz])? {
        return Err(PtxError::ShapeMismatch {
            context: "save_nifti",
            expected: vec![nx, ny, nz],
            found: vec![data.len()],
        });
    }
    if [nx, ny, nz].iter().any(|&d| d == 0 || d > i16::MAX as usize) {
        return Err(PtxError::Nifti(format!("dimensions {:?} out of range", dims)));
    }

    // NIfTI-1 header (348 bytes)
    let mut header = [0u8; 348];

    // sizeof_hdr = 348
    header[0..4].copy_from_slice(&348i32.to_le_bytes());

    // dim[0..7]
    let ndim: i16 = if nz == 1 { 2 } else { 3 };
    let dim: [i16; 8] = [ndim, nx as i16, ny as i16, nz as i16, 1, 1, 1, 1];
    for (i, &d) in dim.iter().enumerate() {
        let offset = 40 + i * 2;
        header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
    }

    // datatype = 16 (FLOAT32), bitpix = 32
    header[70..72].copy_from_slice(&16i16.to_le_bytes());
    header[72..74].copy_from_slice(&32i16.to_le_bytes());

    let pixdim: [f32; 8] = [1.0, vsx as f32, vsy as f32, vsz as f32, 1.0, 1.0, 1.0, 1.0];
    for (i, &p) in pixdim.iter().enumerate() {
        let offset = 76 + i * 4;
        header[offset..offset + 4].copy_from_slice(&p.to_le_bytes());
    }

    // vox_offset = 352 (header + 4 bytes extension)
    header[108..112].copy_from_slice(&352.0f32.to_le_bytes());

    // scl_slope = 1, scl_inter = 0
    header[112..116].copy_from_slice(&1.0f32.to_le_bytes());
    header[116..120].copy_from_slice(&0.0f32.to_le_bytes());

    // sform_code = 1 (scanner anat)
    header[254..256].copy_from_slice(&1i16.to_le_bytes());

    // srow_x, srow_y, srow_z
    for row in 0..3 {
        for i in 0..4 {
            let offset = 280 + row * 16 + i * 4;
            header[offset..offset + 4].copy_from_slice(&(affine[row * 4 + i] as f32).to_le_bytes());
        }
    }

    // magic = "n+1\0" for NIfTI-1 single file
    header[344..348].copy_from_slice(b"n+1\0");

    let mut buffer = Vec::with_capacity(352 + data.len() * 4);
    buffer.extend_from_slice(&header);
    // no extension
    buffer.extend_from_slice(&[0u8; 4]);
    for &val in data {
        buffer.extend_from_slice(&(val as f32).to_le_bytes());
    }

    Ok(buffer)
}

/// Save data as gzipped NIfTI bytes (.nii.gz)
pub fn save_nifti_gz(
    data: &[f64],
    dims: (usize, usize, usize),
    voxel_size: (f64, f64, f64),
    affine: &[f64; 16],
) -> Result<Vec<u8>> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let uncompressed = save_nifti(data, dims, voxel_size, affine)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&uncompressed)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affine_identity() {
        let mut header = NiftiHeader::default();
        header.pixdim[1] = 1.0;
        header.pixdim[2] = 2.0;
        header.pixdim[3] = 3.0;
        header.sform_code = 0;

        let affine = get_affine(&header);
        assert_eq!(affine[0], 1.0);
        assert_eq!(affine[5], 2.0);
        assert_eq!(affine[10], 3.0);
    }

    #[test]
    fn test_gzip_detection() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x00]));
        assert!(!is_gzip(&[0x00, 0x00, 0x00]));
        assert!(!is_gzip(&[0x1f])); // Too short
    }

    #[test]
    fn test_save_nifti_header() {
        let data = vec![0.0; 8]; // 4x2 image
        let bytes = save_nifti(&data, (4, 2, 1), (1.0, 1.0, 1.0), &identity_affine((1.0, 1.0, 1.0))).unwrap();

        assert_eq!(bytes.len(), 352 + 8 * 4);
        assert_eq!(&bytes[344..348], b"n+1\0");
        let sizeof_hdr = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(sizeof_hdr, 348);
        let ndim = i16::from_le_bytes([bytes[40], bytes[41]]);
        assert_eq!(ndim, 2);
    }

    #[test]
    fn test_save_rejects_wrong_length() {
        let affine = identity_affine((1.0, 1.0, 1.0));
        assert!(save_nifti(&[0.0; 5], (2, 2, 1), (1.0, 1.0, 1.0), &affine).is_err());
        assert!(save_nifti(&[0.0; 5], (usize::MAX, 2, 1), (1.0, 1.0, 1.0), &affine).is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let (nx, ny) = (5, 3);
        let data: Vec<f64> = (0..nx * ny).map(|i| i as f64 * 0.5).collect();
        let affine = identity_affine((2.0, 2.0, 1.0));
        let bytes = save_nifti_gz(&data, (nx, ny, 1), (2.0, 2.0, 1.0), &affine).unwrap();

        let loaded = load_nifti(&bytes).unwrap();
        assert_eq!(loaded.dims, (nx, ny, 1));
        assert_eq!(loaded.voxel_size.0, 2.0);
        for (a, b) in loaded.data.iter().zip(data.iter()) {
            assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_nifti_file("/nonexistent/target.nii").err().unwrap();
        assert!(matches!(err, PtxError::Io(_)), "unexpected error: {}", err);
    }

    #[test]
    fn test_garbage_bytes() {
        assert!(matches!(load_nifti(&[0u8; 16]), Err(PtxError::Nifti(_))));
    }
}
