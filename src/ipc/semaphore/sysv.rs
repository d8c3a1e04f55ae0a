/*!
 * System V Semaphore Backend
 *
 * Kernel-held semaphore sets named by an integer key. Unrelated processes
 * that pass the same key to `semget` share the same counters.
 */

use super::traits::SemaphoreBackend;
use super::types::{SemError, SemOp, SemResult};
use crate::core::limits::SEM_PERMISSIONS;
use crate::core::types::{SemKey, SemSetId, SemValue};
use nix::errno::Errno;
use tracing::{debug, trace};

fn last_error(op: SemOp) -> SemError {
    let errno = Errno::last();
    SemError::os(op, errno as i32, errno.desc())
}

fn sem_num(index: usize) -> SemResult<libc::c_ushort> {
    libc::c_ushort::try_from(index).map_err(|_| SemError::IndexOutOfRange {
        index,
        count: libc::c_ushort::MAX as usize + 1,
    })
}

fn sembuf(num: libc::c_ushort, op: libc::c_short, flags: libc::c_short) -> libc::sembuf {
    libc::sembuf {
        sem_num: num,
        sem_op: op,
        sem_flg: flags,
    }
}

/// Kernel System V semaphore backend
///
/// Operations use `sem_flg = 0` (no `SEM_UNDO`): a process killed while
/// holding a counter leaves it decremented.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysVBackend;

impl SysVBackend {
    pub fn new() -> Self {
        Self
    }

    /// Run a semop array; `Ok(false)` if it would have blocked on an `IPC_NOWAIT` op
    fn semop(&self, set: SemSetId, ops: &mut [libc::sembuf], op: SemOp) -> SemResult<bool> {
        // SAFETY: `ops` is a valid, exclusively borrowed buffer of `ops.len()` sembufs
        let rc = unsafe { libc::semop(set.0, ops.as_mut_ptr(), ops.len()) };
        if rc == 0 {
            return Ok(true);
        }
        match Errno::last() {
            Errno::EAGAIN => Ok(false),
            Errno::EIDRM => Err(SemError::Removed(set)),
            Errno::EINVAL => Err(SemError::NotFound(set)),
            errno => Err(SemError::os(op, errno as i32, errno.desc())),
        }
    }
}

impl SemaphoreBackend for SysVBackend {
    fn ensure(&self, key: SemKey, count: usize) -> SemResult<SemSetId> {
        let nsems = libc::c_int::try_from(count).map_err(|_| SemError::IndexOutOfRange {
            index: count,
            count: libc::c_int::MAX as usize,
        })?;
        // SAFETY: semget has no pointer arguments
        let id = unsafe { libc::semget(key.raw(), nsems, libc::IPC_CREAT | SEM_PERMISSIONS) };
        if id < 0 {
            return Err(last_error(SemOp::Get));
        }
        debug!(key = %key, set = id, count, "attached to System V semaphore set");
        Ok(SemSetId(id))
    }

    fn lookup(&self, key: SemKey) -> SemResult<Option<SemSetId>> {
        // SAFETY: semget has no pointer arguments
        let id = unsafe { libc::semget(key.raw(), 0, 0) };
        if id >= 0 {
            return Ok(Some(SemSetId(id)));
        }
        match Errno::last() {
            Errno::ENOENT => Ok(None),
            errno => Err(SemError::os(SemOp::Get, errno as i32, errno.desc())),
        }
    }

    fn set_value(&self, set: SemSetId, index: usize, value: SemValue) -> SemResult<()> {
        let num = sem_num(index)?;
        // SAFETY: SETVAL reads its union semun argument as an int `val`
        let rc = unsafe { libc::semctl(set.0, num as libc::c_int, libc::SETVAL, value as libc::c_int) };
        if rc < 0 {
            return Err(last_error(SemOp::SetValue));
        }
        Ok(())
    }

    fn value(&self, set: SemSetId, index: usize) -> SemResult<SemValue> {
        let num = sem_num(index)?;
        // SAFETY: GETVAL takes no fourth argument
        let rc = unsafe { libc::semctl(set.0, num as libc::c_int, libc::GETVAL) };
        if rc < 0 {
            return Err(last_error(SemOp::GetValue));
        }
        Ok(rc)
    }

    fn acquire(&self, set: SemSetId, index: usize) -> SemResult<()> {
        let mut ops = [sembuf(sem_num(index)?, -1, 0)];
        trace!(set = %set, index, "semop P");
        self.semop(set, &mut ops, SemOp::Acquire).map(|_| ())
    }

    fn acquire_and_test_zero(&self, set: SemSetId, index: usize) -> SemResult<bool> {
        let num = sem_num(index)?;
        let nowait = libc::IPC_NOWAIT as libc::c_short;
        loop {
            // Value exactly 1: decrement, then the wait-for-zero succeeds
            let mut to_zero = [sembuf(num, -1, 0), sembuf(num, 0, nowait)];
            if self.semop(set, &mut to_zero, SemOp::Acquire)? {
                return Ok(true);
            }
            // Value at least 2: take two, give one back
            let mut stay_positive = [sembuf(num, -2, nowait), sembuf(num, 1, 0)];
            if self.semop(set, &mut stay_positive, SemOp::Acquire)? {
                return Ok(false);
            }
        }
    }

    fn release(&self, set: SemSetId, index: usize) -> SemResult<()> {
        let mut ops = [sembuf(sem_num(index)?, 1, 0)];
        trace!(set = %set, index, "semop V");
        self.semop(set, &mut ops, SemOp::Release).map(|_| ())
    }

    fn remove(&self, set: SemSetId) -> SemResult<()> {
        // SAFETY: IPC_RMID ignores the semnum and fourth argument
        let rc = unsafe { libc::semctl(set.0, 0, libc::IPC_RMID) };
        if rc < 0 {
            return match Errno::last() {
                Errno::EINVAL | Errno::EIDRM => Err(SemError::NotFound(set)),
                errno => Err(SemError::os(SemOp::Remove, errno as i32, errno.desc())),
            };
        }
        debug!(set = %set, "removed System V semaphore set");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sysv"
    }
}
