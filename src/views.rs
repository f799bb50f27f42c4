//! Spectra and wavelengths assembled from decoded blocks.
//!
//! ```no_run
//! use specfp::views::load;
//!
//! let spectra = load("map.wdf")?;
//! println!("{} spectra × {} points", spectra.count(), spectra.points());
//! spectra.write_csv(std::io::stdout())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use ndarray::{Array2, ArrayView1, Axis};
use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;

use crate::block::Tag;
use crate::codec::CodecError;
use crate::io_stream::{DecodedStream, WdfReader};

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Nothing decoded yet; call decode_all first")]
    NotDecoded,
    #[error("Block {tag} is missing from the stream")]
    MissingBlock { tag: Tag },
    #[error("Shape mismatch: expected {expected} values, found {actual}")]
    ShapeMismatch { expected: u64, actual: u64 },
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Decode error: {0}")]
    Codec(#[from] CodecError),
    #[error("View error: {0}")]
    View(#[from] ViewError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

// ── Views over a decoded stream ──────────────────────────────────────────────

impl DecodedStream {
    /// `count × points` matrix, one row per spectrum.
    pub fn spectra(&self) -> Result<Array2<f32>, ViewError> {
        let meta = self.metadata().ok_or(ViewError::MissingBlock { tag: Tag::WDF1 })?;
        let data = self.data().ok_or(ViewError::MissingBlock { tag: Tag::DATA })?;

        let expected = meta.declared_counts().data;
        let actual   = data.spectra.len() as u64;
        if expected != actual {
            return Err(ViewError::ShapeMismatch { expected, actual });
        }
        Array2::from_shape_vec((meta.count as usize, meta.points as usize), data.spectra.clone())
            .map_err(|_| ViewError::ShapeMismatch { expected, actual })
    }

    /// The `XLST` domain, one value per point.
    pub fn wavelengths(&self) -> Result<&[f32], ViewError> {
        self.axis(Tag::XLST)
            .map(|a| a.domain.as_slice())
            .ok_or(ViewError::MissingBlock { tag: Tag::XLST })
    }
}

impl<R: Read> WdfReader<R> {
    pub fn spectra(&self) -> Result<Array2<f32>, ViewError> {
        self.ensure_decoded()?;
        self.stream().spectra()
    }

    pub fn wavelengths(&self) -> Result<&[f32], ViewError> {
        self.ensure_decoded()?;
        self.stream().wavelengths()
    }

    fn ensure_decoded(&self) -> Result<(), ViewError> {
        if self.is_decoded() { Ok(()) } else { Err(ViewError::NotDecoded) }
    }
}

// ── Spectra table ────────────────────────────────────────────────────────────

/// Spectra labelled by wavelength.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectra {
    pub wavelengths: Vec<f32>,
    /// One row per spectrum, one column per wavelength.
    pub intensities: Array2<f32>,
}

impl Spectra {
    pub fn from_stream(stream: &DecodedStream) -> Result<Self, ViewError> {
        let intensities = stream.spectra()?;
        let wavelengths = stream.wavelengths()?.to_vec();
        if wavelengths.len() != intensities.ncols() {
            return Err(ViewError::ShapeMismatch {
                expected: intensities.ncols() as u64,
                actual:   wavelengths.len() as u64,
            });
        }
        Ok(Self { wavelengths, intensities })
    }

    pub fn count(&self) -> usize {
        self.intensities.nrows()
    }

    pub fn points(&self) -> usize {
        self.intensities.ncols()
    }

    pub fn spectrum(&self, index: usize) -> Option<ArrayView1<'_, f32>> {
        (index < self.count()).then(|| self.intensities.index_axis(Axis(0), index))
    }

    /// Write one row per wavelength and one column per spectrum:
    /// `wavelength,0,1,…` then the values.
    ///
    /// The first header cell is `wavelength`; a bare transposed table would
    /// leave it empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new().from_writer(writer);

        let mut header = Vec::with_capacity(self.count() + 1);
        header.push("wavelength".to_string());
        header.extend((0..self.count()).map(|i| i.to_string()));
        wtr.write_record(&header)?;

        for (point, wavelength) in self.wavelengths.iter().enumerate() {
            let mut record = Vec::with_capacity(self.count() + 1);
            record.push(wavelength.to_string());
            for v in self.intensities.index_axis(Axis(1), point) {
                record.push(v.to_string());
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Open, decode and tabulate a WDF file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Spectra, LoadError> {
    let mut wdf = WdfReader::open(path)?;
    wdf.decode_all()?;
    Ok(Spectra::from_stream(wdf.stream())?)
}
