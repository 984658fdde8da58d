use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::class::EventClass;
use crate::compression::{compress_writer, CompressedWriter, Compression};
use crate::traits::CsvRecord;

/// An output file, optionally compressed
#[derive(Clone, Debug, TypedBuilder)]
pub struct OutputFile {
    /// File name without compression suffix
    #[builder(setter(into))]
    filename: PathBuf,
    #[builder(default)]
    compression: Option<Compression>,
}

impl OutputFile {
    /// The default output file for rows of type `R` and the given class
    pub fn for_class<R: CsvRecord>(
        outdir: &Path,
        class: EventClass,
        compression: Option<Compression>,
    ) -> Self {
        Self::builder()
            .filename(outdir.join(format!("{class}_{}.csv", R::KIND)))
            .compression(compression)
            .build()
    }

    /// The actual path including any compression suffix
    pub fn path(&self) -> PathBuf {
        match self.compression {
            Some(compression) => {
                let mut path = OsString::from(self.filename.as_os_str());
                path.push(compression.extension());
                PathBuf::from(path)
            }
            None => self.filename.clone(),
        }
    }

    /// Create the file and write the header line
    pub fn create<R: CsvRecord>(
        &self,
    ) -> Result<CsvWriter<CompressedWriter<File>, R>, WriteError> {
        let path = self.path();
        debug!("Creating {path:?}");
        let file = File::create(&path).map_err(|source| WriteError::Create {
            path: path.clone(),
            source,
        })?;
        let writer = compress_writer(file, self.compression).map_err(|source| {
            WriteError::Create {
                path: path.clone(),
                source,
            }
        })?;
        CsvWriter::new(writer)
    }
}

/// Writer for rows of a fixed type
///
/// The header is written immediately, so even files without any rows
/// have one.
pub struct CsvWriter<W: Write, R> {
    writer: csv::Writer<W>,
    rows: u64,
    record: PhantomData<R>,
}

impl<W: Write, R: CsvRecord> CsvWriter<W, R> {
    pub fn new(writer: W) -> Result<Self, WriteError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        writer.write_record(R::HEADER)?;
        Ok(Self {
            writer,
            rows: 0,
            record: PhantomData,
        })
    }

    pub fn write(&mut self, row: &R) -> Result<(), WriteError> {
        self.writer.serialize(row)?;
        self.rows += 1;
        Ok(())
    }

    /// Number of rows written so far, not counting the header
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush all rows and return the underlying writer
    pub fn finish(self) -> Result<W, WriteError> {
        self.writer
            .into_inner()
            .map_err(|err| WriteError::IOError(err.into_error()))
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to create {path:?}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write CSV row")]
    CsvError(#[from] csv::Error),
    #[error("I/O error")]
    IOError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::features::{EventRow, ParticleRow};

    fn row() -> ParticleRow {
        ParticleRow {
            event: 3,
            particle_id: -211,
            charged: 1,
            pt: 0.5,
            eta: -1.25,
            phi: 0.75,
            rapidity: f64::INFINITY,
            energy: 2.,
            class: 1,
        }
    }

    #[test]
    fn header_without_rows() {
        let writer = CsvWriter::<_, EventRow>::new(Vec::new()).unwrap();
        assert_eq!(writer.rows(), 0);
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "Class,TotalMultiplicity,ChargedMultiplicity,Mean_pT,Var_pT,Mean_Eta,Var_Eta,Mean_Phi,Var_Phi,TotalEnergy\n"
        );
    }

    #[test]
    fn rows() {
        let mut writer = CsvWriter::new(Vec::new()).unwrap();
        writer.write(&row()).unwrap();
        writer.write(&ParticleRow { event: 4, ..row() }).unwrap();
        assert_eq!(writer.rows(), 2);
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "Event,ParticleID,Charged,pT,Eta,Phi,Rapidity,Energy,Class");
        assert_eq!(lines[1], "3,-211,1,0.5,-1.25,0.75,inf,2.0,1");
        assert_eq!(lines[2], "4,-211,1,0.5,-1.25,0.75,inf,2.0,1");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn header_matches_fields() {
        // serialising with automatic headers yields the field names
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(row()).unwrap();
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(out.lines().next(), Some(ParticleRow::HEADER.join(",").as_str()));
    }

    #[test]
    fn file_names() {
        let dir = tempfile::tempdir().unwrap();
        let plain = OutputFile::for_class::<EventRow>(dir.path(), EventClass::NonDiffractive, None);
        assert_eq!(plain.path(), dir.path().join("non_diffractive_events.csv"));
        let compressed = OutputFile::for_class::<ParticleRow>(
            dir.path(),
            EventClass::Diffractive,
            Some(Compression::Gzip(6)),
        );
        assert_eq!(compressed.path(), dir.path().join("diffractive_particles.csv.gz"));

        let writer = plain.create::<EventRow>().unwrap();
        writer.finish().unwrap().finish().unwrap();
        let content = std::fs::read_to_string(plain.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn compressed_file() {
        use std::io::Read;

        let dir = tempfile::tempdir().unwrap();
        let file = OutputFile::for_class::<ParticleRow>(
            dir.path(),
            EventClass::Diffractive,
            Some(Compression::Zstd(3)),
        );
        let mut writer = file.create().unwrap();
        writer.write(&row()).unwrap();
        writer.finish().unwrap().finish().unwrap();

        let mut content = String::new();
        zstd::Decoder::new(std::fs::File::open(file.path()).unwrap())
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(content.lines().nth(1), Some("3,-211,1,0.5,-1.25,0.75,inf,2.0,1"));
    }
}
