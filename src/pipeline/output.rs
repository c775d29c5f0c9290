//! Output sink targets

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::os::unix::io::{FromRawFd, RawFd};
use std::path::PathBuf;

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use tracing::debug;

use super::error::{PipelineError, PipelineResult};

/// Where encoded packets are written
pub enum OutputTarget {
    /// File created (or truncated) when the codec is opened
    Path(PathBuf),

    /// Already-open descriptor; the context takes ownership and closes it
    RawFd(RawFd),

    /// Any writer, e.g. a socket or an in-memory buffer
    Writer(Box<dyn Write + Send>),
}

impl OutputTarget {
    /// Open the target as a byte sink
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidOutputTarget`] if the file cannot be
    /// created, or the descriptor is not open for writing.
    pub fn open(self) -> PipelineResult<Box<dyn Write + Send>> {
        match self {
            OutputTarget::Path(path) => {
                let file = File::create(&path).map_err(|e| {
                    PipelineError::InvalidOutputTarget(format!("{}: {}", path.display(), e))
                })?;
                debug!("Opened output file {}", path.display());
                Ok(Box::new(file))
            }
            OutputTarget::RawFd(fd) => {
                check_writable_fd(fd)?;
                // SAFETY: the descriptor was checked open above and ownership
                // passes to the File, which is the only owner from here on.
                #[allow(unsafe_code)]
                let file = unsafe { File::from_raw_fd(fd) };
                debug!("Using output descriptor {}", fd);
                Ok(Box::new(file))
            }
            OutputTarget::Writer(writer) => Ok(writer),
        }
    }
}

impl fmt::Debug for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Path(path) => f.debug_tuple("Path").field(path).finish(),
            OutputTarget::RawFd(fd) => f.debug_tuple("RawFd").field(fd).finish(),
            OutputTarget::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

impl From<PathBuf> for OutputTarget {
    fn from(path: PathBuf) -> Self {
        OutputTarget::Path(path)
    }
}

fn check_writable_fd(fd: RawFd) -> PipelineResult<()> {
    if fd <= 0 {
        return Err(PipelineError::InvalidOutputTarget(format!(
            "invalid file descriptor {}",
            fd
        )));
    }

    let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(|e| {
        PipelineError::InvalidOutputTarget(format!("file descriptor {}: {}", fd, e))
    })?;

    let access = OFlag::from_bits_truncate(flags) & OFlag::O_ACCMODE;
    if access == OFlag::O_RDONLY {
        return Err(PipelineError::InvalidOutputTarget(format!(
            "file descriptor {} is read-only",
            fd
        )));
    }
    Ok(())
}
