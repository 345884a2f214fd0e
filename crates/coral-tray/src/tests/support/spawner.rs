//! In-memory [`BackendSpawner`] with a controllable process table.

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::launch::LaunchContext;
use crate::process::{BackendSpawner, Generation, SpawnError, TerminateError};

const FIRST_PID: u32 = 4100;

#[derive(Debug, Default)]
struct ProcessTable {
    next_pid: u32,
    alive: BTreeSet<u32>,
    spawns: Vec<(u32, Generation, PathBuf)>,
    terminated: Vec<u32>,
    fail_spawns: bool,
}

/// Shared fake process table; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct FakeSpawner {
    table: Arc<Mutex<ProcessTable>>,
}

impl FakeSpawner {
    fn table(&self) -> MutexGuard<'_, ProcessTable> {
        self.table.lock().expect("fake spawner mutex poisoned")
    }

    /// Makes every following spawn fail as if the executable were missing.
    pub fn fail_spawns(&self) {
        self.table().fail_spawns = true;
    }

    /// Marks `pid` dead without the supervisor's involvement.
    pub fn kill_externally(&self, pid: u32) {
        self.table().alive.remove(&pid);
    }

    /// Number of successful spawns.
    #[must_use]
    pub fn spawn_count(&self) -> usize {
        self.table().spawns.len()
    }

    /// Most recent spawn.
    #[must_use]
    pub fn last_spawn(&self) -> Option<(u32, Generation)> {
        self.table()
            .spawns
            .last()
            .map(|(pid, generation, _)| (*pid, *generation))
    }

    /// Config path passed to each spawn, in order.
    #[must_use]
    pub fn spawned_configs(&self) -> Vec<PathBuf> {
        self.table()
            .spawns
            .iter()
            .map(|(_, _, config)| config.clone())
            .collect()
    }

    /// Pids that received a termination request.
    #[must_use]
    pub fn terminated(&self) -> Vec<u32> {
        self.table().terminated.clone()
    }

    /// Number of live fake processes.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.table().alive.len()
    }
}

impl BackendSpawner for FakeSpawner {
    fn spawn(&mut self, context: &LaunchContext, generation: Generation) -> Result<u32, SpawnError> {
        let mut table = self.table();
        if table.fail_spawns {
            return Err(SpawnError::Spawn {
                executable: context.executable().to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            });
        }
        let pid = FIRST_PID + table.next_pid;
        table.next_pid += 1;
        table.alive.insert(pid);
        table
            .spawns
            .push((pid, generation, context.config_file().to_path_buf()));
        Ok(pid)
    }

    fn terminate(&mut self, pid: u32) -> Result<(), TerminateError> {
        let mut table = self.table();
        table.terminated.push(pid);
        table.alive.remove(&pid);
        Ok(())
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.table().alive.contains(&pid)
    }
}
