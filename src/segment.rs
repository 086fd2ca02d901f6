//! Shared memory segment holding one worker's record
//!
//! The segment is a System V shared memory region keyed by `ftok()` on a
//! per-worker token file (`worker_<id>.key`). The token file also stores the
//! derived key as decimal text, so another process can find the segment from
//! the worker id alone.
//!
//! Ownership:
//! - The token file is held under an exclusive `flock` for as long as the
//!   handle lives, so only one worker per id can own the record.
//! - Dropping a handle always detaches the mapping.
//! - `release()` detaches and also marks the region for removal.

use crate::error::{SetupError, ShutdownError};
use crate::record::WorkerRecord;
use crate::WorkerId;

use fs2::FileExt;
use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::mem;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

/// Project id passed to `ftok()` together with the token file path
pub const KEY_PROJECT_ID: i32 = 65;

/// Access to the memory holding a `WorkerRecord`
///
/// Implemented by the shared segment in production and by `HeapRecord`
/// where no other process needs to see the record.
pub trait RecordStore: Send {
    fn record(&self) -> &WorkerRecord;

    fn record_mut(&mut self) -> &mut WorkerRecord;

    /// Gives the backing memory back; called once, after all users stopped
    fn release(self) -> Result<(), ShutdownError>
    where
        Self: Sized;
}

/// Path of the token file for `worker_id` inside `dir`
pub fn token_path(dir: &Path, worker_id: WorkerId) -> PathBuf {
    dir.join(format!("worker_{}.key", worker_id))
}

/// Derives the IPC key for an existing token file
fn derive_key(path: &Path) -> io::Result<libc::key_t> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let key = unsafe { libc::ftok(c_path.as_ptr(), KEY_PROJECT_ID) };
    if key == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(key)
}

/// Reads the key a running worker wrote into its token file
pub fn read_key(path: &Path) -> io::Result<libc::key_t> {
    let text = std::fs::read_to_string(path)?;
    text.trim().parse().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid key in {}: {}", path.display(), e),
        )
    })
}

/// A `shmat()` mapping of one record, detached on drop
struct Attachment {
    shmid: libc::c_int,
    ptr: NonNull<WorkerRecord>,
    attached: bool,
}

// The mapping is process-wide; the pointer is valid from any thread.
unsafe impl Send for Attachment {}

impl Attachment {
    fn attach(shmid: libc::c_int, flags: libc::c_int) -> io::Result<Self> {
        let addr = unsafe { libc::shmat(shmid, ptr::null(), flags) };
        if addr as isize == -1 {
            return Err(io::Error::last_os_error());
        }
        let ptr = NonNull::new(addr.cast::<WorkerRecord>())
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "shmat returned null"))?;
        Ok(Attachment {
            shmid,
            ptr,
            attached: true,
        })
    }

    fn detach(&mut self) -> io::Result<()> {
        if !self.attached {
            return Ok(());
        }
        self.attached = false;
        if unsafe { libc::shmdt(self.ptr.as_ptr().cast::<libc::c_void>()) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        let _ = self.detach();
    }
}

/// Attached but not yet initialized segment
///
/// The record contents are whatever a previous owner left behind until
/// `initialize()` is called.
pub struct SegmentHandle {
    attachment: Attachment,
    key: libc::key_t,
    token_path: PathBuf,
    _token: File,
}

impl SegmentHandle {
    /// Creates (or attaches to) the segment for `worker_id`
    ///
    /// # Errors
    /// `SetupError::SegmentAllocation` if the token file cannot be created or
    /// locked, the key cannot be derived, or the region cannot be created or
    /// attached.
    pub fn create_or_attach(worker_id: WorkerId, dir: &Path) -> Result<Self, SetupError> {
        let token_path = token_path(dir, worker_id);
        let alloc_err =
            |what: &str, e: io::Error| SetupError::SegmentAllocation(format!("{}: {}", what, e));

        // Open without truncating; the file is rewritten only once we hold the lock.
        let mut token = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&token_path)
            .map_err(|e| alloc_err(&format!("failed to open key file {}", token_path.display()), e))?;

        if token.try_lock_exclusive().is_err() {
            return Err(SetupError::SegmentAllocation(format!(
                "worker {} is already running (key file {} is locked)",
                worker_id,
                token_path.display()
            )));
        }

        let key = derive_key(&token_path).map_err(|e| alloc_err("ftok", e))?;

        token
            .set_len(0)
            .and_then(|_| token.write_all(key.to_string().as_bytes()))
            .and_then(|_| token.flush())
            .map_err(|e| alloc_err(&format!("failed to write key file {}", token_path.display()), e))?;

        let shmid = unsafe {
            libc::shmget(
                key,
                mem::size_of::<WorkerRecord>(),
                0o666 | libc::IPC_CREAT,
            )
        };
        if shmid == -1 {
            return Err(alloc_err("shmget", io::Error::last_os_error()));
        }

        let attachment = Attachment::attach(shmid, 0).map_err(|e| alloc_err("shmat", e))?;

        Ok(SegmentHandle {
            attachment,
            key,
            token_path,
            _token: token,
        })
    }

    pub fn key(&self) -> libc::key_t {
        self.key
    }

    /// Writes the startup record; the only way to obtain a usable `Segment`
    pub fn initialize(self) -> Segment {
        unsafe { ptr::write(self.attachment.ptr.as_ptr(), WorkerRecord::initial()) };
        Segment { handle: self }
    }
}

/// Attached and initialized segment owned by the running worker
pub struct Segment {
    handle: SegmentHandle,
}

impl Segment {
    pub fn key(&self) -> libc::key_t {
        self.handle.key
    }

    pub fn token_path(&self) -> &Path {
        &self.handle.token_path
    }
}

impl RecordStore for Segment {
    fn record(&self) -> &WorkerRecord {
        unsafe { self.handle.attachment.ptr.as_ref() }
    }

    fn record_mut(&mut self) -> &mut WorkerRecord {
        unsafe { self.handle.attachment.ptr.as_mut() }
    }

    fn release(mut self) -> Result<(), ShutdownError> {
        let attachment = &mut self.handle.attachment;
        let detached = attachment.detach().map_err(ShutdownError::Detach);
        let removed =
            if unsafe { libc::shmctl(attachment.shmid, libc::IPC_RMID, ptr::null_mut()) } == -1 {
                Err(ShutdownError::Remove(io::Error::last_os_error()))
            } else {
                Ok(())
            };
        detached.and(removed)
    }
}

/// Read-only attachment used to inspect another process's worker
pub struct SegmentView {
    attachment: Attachment,
}

impl SegmentView {
    /// Finds the segment of a running worker through its token file
    pub fn open(worker_id: WorkerId, dir: &Path) -> io::Result<Self> {
        let key = read_key(&token_path(dir, worker_id))?;
        let shmid = unsafe { libc::shmget(key, mem::size_of::<WorkerRecord>(), 0) };
        if shmid == -1 {
            return Err(io::Error::last_os_error());
        }
        let attachment = Attachment::attach(shmid, libc::SHM_RDONLY)?;
        Ok(SegmentView { attachment })
    }

    /// Copies the record out without any locking; may be torn mid-update
    pub fn snapshot(&self) -> WorkerRecord {
        unsafe { ptr::read_volatile(self.attachment.ptr.as_ptr()) }
    }
}

/// Record kept in ordinary process memory
#[derive(Debug, Default)]
pub struct HeapRecord {
    record: WorkerRecord,
}

impl HeapRecord {
    pub fn new() -> Self {
        HeapRecord {
            record: WorkerRecord::initial(),
        }
    }
}

impl RecordStore for HeapRecord {
    fn record(&self) -> &WorkerRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut WorkerRecord {
        &mut self.record
    }

    fn release(self) -> Result<(), ShutdownError> {
        Ok(())
    }
}
