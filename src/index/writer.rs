//! Index writer.
//!
//! Tables are written into a hidden staging directory next to the index and
//! published by rename once every table succeeded. The project file is
//! removed first and renamed into place last, so a reader never accepts a
//! half-replaced index. Dropping an uncommitted writer removes the staging
//! directory and leaves any prior index untouched.

use crate::encseq::EncodedSequence;
use crate::error::{Error, Result};
use crate::index::suffix_array::types::{BucketEntry, SuffixEntry};
use crate::index::suffix_array::SuffixArrayWriter;
use crate::index::types::*;
use crate::utils::{index_dir, index_file, write_u64_le, write_uint_le};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes the tables of one construction run
pub struct IndexWriter {
    index_name: PathBuf,
    staging: PathBuf,
    build_id: u64,
    written: TableSet,
    committed: bool,
}

impl IndexWriter {
    /// Start a new index; fails when the destination directory does not exist
    pub fn create(index_name: &Path) -> Result<Self> {
        let dir = index_dir(index_name);
        if !dir.is_dir() {
            return Err(Error::io(
                format!("cannot create index {}", index_name.display()),
                io::Error::new(io::ErrorKind::NotFound, format!("directory {} does not exist", dir.display())),
            ));
        }
        let base = index_name
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let build_id: u64 = rand::random();
        let staging = dir.join(format!(".{}.sfxidx-{:016x}", base, build_id));
        fs::create_dir(&staging).map_err(|e| Error::file("create staging directory", &staging, e))?;
        log::debug!("staging index {} in {}", index_name.display(), staging.display());

        Ok(Self {
            index_name: index_name.to_path_buf(),
            staging,
            build_id,
            written: TableSet::new(),
            committed: false,
        })
    }

    pub fn build_id(&self) -> u64 {
        self.build_id
    }

    pub fn index_name(&self) -> &Path {
        &self.index_name
    }

    /// Tables written so far
    pub fn written(&self) -> TableSet {
        self.written
    }

    fn staged(&self, extension: &str) -> PathBuf {
        let base = self.index_name.file_name().unwrap_or_default();
        index_file(&self.staging.join(base), extension)
    }

    /// Write one table: header, then the payload produced by `body`
    pub fn write_table<F>(&mut self, kind: TableKind, count: u64, width: u32, body: F) -> Result<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
    {
        let path = self.staged(kind.ext());
        let result: io::Result<()> = (|| {
            let mut file = BufWriter::with_capacity(65536, File::create(&path)?);
            TableHeader::new(kind, self.build_id, count, width).write(&mut file)?;
            body(&mut file)?;
            file.flush()?;
            Ok(())
        })();
        result.map_err(|e| Error::file("write", &index_file(&self.index_name, kind.ext()), e))?;
        self.written.insert(kind);
        log::debug!("wrote {} table ({} entries)", kind, count);
        Ok(())
    }

    pub fn write_encoded(&mut self, encoded: &EncodedSequence) -> Result<()> {
        self.write_table(TableKind::Tis, encoded.total_length(), encoded.kind().code(), |w| {
            encoded.write_payload(w)
        })
    }

    pub fn write_suffixes(&mut self, suffixes: &[SuffixEntry], width: usize) -> Result<()> {
        self.write_table(TableKind::Suf, suffixes.len() as u64, width as u32, |w| {
            SuffixArrayWriter::write_suffixes(w, suffixes, width)
        })
    }

    pub fn write_lcp(&mut self, lcp: &[u64]) -> Result<()> {
        self.write_table(TableKind::Lcp, lcp.len() as u64, 1, |w| SuffixArrayWriter::write_lcp(w, lcp))
    }

    pub fn write_bwt(&mut self, bwt: &[u8]) -> Result<()> {
        self.write_table(TableKind::Bwt, bwt.len() as u64, 1, |w| SuffixArrayWriter::write_bwt(w, bwt))
    }

    pub fn write_buckets(&mut self, buckets: &[BucketEntry], width: usize) -> Result<()> {
        self.write_table(TableKind::Bck, buckets.len() as u64, width as u32, |w| {
            SuffixArrayWriter::write_buckets(w, buckets, width)
        })
    }

    /// `des`: every description followed by a newline
    pub fn write_descriptions(&mut self, descriptions: &[String]) -> Result<()> {
        let bytes: u64 = descriptions.iter().map(|d| d.len() as u64 + 1).sum();
        self.write_table(TableKind::Des, bytes, 1, |w| {
            for description in descriptions {
                w.write_all(description.as_bytes())?;
                w.write_all(b"\n")?;
            }
            Ok(())
        })
    }

    /// `sds`: exclusive end offset of each description in `des`
    pub fn write_description_ends(&mut self, descriptions: &[String]) -> Result<()> {
        self.write_table(TableKind::Sds, descriptions.len() as u64, 8, |w| {
            let mut end = 0u64;
            for description in descriptions {
                end += description.len() as u64 + 1;
                write_u64_le(w, end)?;
            }
            Ok(())
        })
    }

    /// `ssp`: separator positions
    pub fn write_separators(&mut self, separators: &[u64], width: usize) -> Result<()> {
        self.write_table(TableKind::Ssp, separators.len() as u64, width as u32, |w| {
            for &p in separators {
                write_uint_le(w, p, width)?;
            }
            Ok(())
        })
    }

    /// Publish the staged tables under the index name
    pub fn commit(mut self, project: &IndexProject) -> Result<()> {
        let prj_staged = self.staged(PROJECT_EXTENSION);
        let write_project = || -> io::Result<()> {
            let mut file = BufWriter::new(File::create(&prj_staged)?);
            serde_json::to_writer_pretty(&mut file, project)?;
            file.write_all(b"\n")?;
            file.flush()
        };
        write_project().map_err(|e| Error::file("write", &prj_staged, e))?;

        let prj_final = index_file(&self.index_name, PROJECT_EXTENSION);
        remove_if_exists(&prj_final)?;
        for kind in TableKind::ALL {
            let target = index_file(&self.index_name, kind.ext());
            if self.written.contains(kind) {
                let staged = self.staged(kind.ext());
                fs::rename(&staged, &target).map_err(|e| Error::file("publish", &target, e))?;
            } else {
                remove_if_exists(&target)?;
            }
        }
        fs::rename(&prj_staged, &prj_final).map_err(|e| Error::file("publish", &prj_final, e))?;

        self.committed = true;
        if let Err(e) = fs::remove_dir(&self.staging) {
            log::warn!("cannot remove staging directory {}: {}", self.staging.display(), e);
        }
        log::info!("index {} written ({})", self.index_name.display(), self.written);
        Ok(())
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_dir_all(&self.staging);
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::file("remove", path, e)),
    }
}
