use crate::{
    environment::Environment,
    objects::{CeremonyState, EngineMessage, TranscriptFile},
    storage::{path_exists, TranscriptStore},
    CoordinatorError,
};

use fs_err::tokio as fs;
use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
    sync::{
        mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
        Notify,
    },
};
use tracing::{debug, error, info, warn};

/// The phases of a sealing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealerState {
    Idle,
    Preparing,
    Computing,
    RenamingOutputs,
    Done,
    Cancelled,
    Failed,
}

impl SealerState {
    /// Returns `true` if no further transition can happen.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SealerState::Done | SealerState::Cancelled | SealerState::Failed)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

///
/// Seals the ceremony by running the external sealing engine over the
/// transcripts of the last completed participant.
///
/// A sealer performs a single attempt. Share it through an `Arc` to call
/// `cancel` while `run` is in progress. There is no timeout: a hung engine
/// keeps `run` pending until the sealer is cancelled or the engine exits.
///
pub struct Sealer<S: TranscriptStore> {
    store: Arc<S>,
    engine_path: PathBuf,
    sealing_path: PathBuf,
    state: Mutex<SealerState>,
    started: AtomicBool,
    cancelled: AtomicBool,
    cancellation: Notify,
    subscribers: Mutex<Vec<UnboundedSender<f64>>>,
}

impl<S: TranscriptStore> Sealer<S> {
    /// Creates a new instance of `Sealer` that launches the engine at `engine_path`.
    pub fn new(store: Arc<S>, engine_path: impl Into<PathBuf>) -> Self {
        let sealing_path = store.sealing_path().to_path_buf();
        Self {
            store,
            engine_path: engine_path.into(),
            sealing_path,
            state: Mutex::new(SealerState::Idle),
            started: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            cancellation: Notify::new(),
            subscribers: Mutex::new(vec![]),
        }
    }

    /// Creates a new instance of `Sealer` using the engine configured in `environment`.
    #[inline]
    pub fn from_environment(store: Arc<S>, environment: &Environment) -> Self {
        Self::new(store, environment.sealing_engine_path())
    }

    #[inline]
    pub fn state(&self) -> SealerState {
        *lock(&self.state)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the scratch directory the engine runs in.
    #[inline]
    pub fn sealing_path(&self) -> &Path {
        &self.sealing_path
    }

    ///
    /// Returns a receiver of progress percentages reported by the engine.
    ///
    /// The receiver closes once the sealer is cancelled or dropped. Subscribing
    /// after cancellation returns a receiver that is already closed.
    ///
    pub fn subscribe(&self) -> UnboundedReceiver<f64> {
        let (sender, receiver) = unbounded_channel();

        // Checked under the lock so a concurrent `cancel` cannot miss this sender.
        let mut subscribers = lock(&self.subscribers);
        if !self.is_cancelled() {
            subscribers.push(sender);
        }
        receiver
    }

    ///
    /// Cancels the sealing run.
    ///
    /// Detaches every progress subscriber and interrupts the engine if it is
    /// running. Returns without waiting for the engine to exit; `run` returns
    /// successfully once it does. Calling this more than once, or before `run`
    /// starts, is safe.
    ///
    pub fn cancel(&self) {
        {
            let mut subscribers = lock(&self.subscribers);
            if self.cancelled.swap(true, Ordering::SeqCst) {
                return;
            }
            subscribers.clear();
        }

        {
            let mut state = lock(&self.state);
            if !state.is_terminal() {
                *state = SealerState::Cancelled;
            }
        }

        // Stores a permit if the run is not waiting yet, so it is never lost.
        self.cancellation.notify_one();
        info!("Sealing has been cancelled");
    }

    ///
    /// Runs the sealing step on the last completed participant of `ceremony`.
    ///
    /// Returns `CoordinatorError::SealerAlreadyStarted` if called more than once.
    ///
    pub async fn run(&self, ceremony: &CeremonyState) -> Result<(), CoordinatorError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CoordinatorError::SealerAlreadyStarted);
        }

        let result = self.seal(ceremony).await;
        match &result {
            Ok(()) => self.transition(SealerState::Done),
            Err(error) => {
                error!("Sealing failed with {}", error);
                self.transition(SealerState::Failed);
            }
        }
        result
    }

    /// Moves to `next` unless the run has been cancelled.
    fn transition(&self, next: SealerState) {
        let mut state = lock(&self.state);
        if *state != SealerState::Cancelled {
            debug!("Sealer is moving from {:?} to {:?}", *state, next);
            *state = next;
        }
    }

    async fn seal(&self, ceremony: &CeremonyState) -> Result<(), CoordinatorError> {
        self.transition(SealerState::Preparing);

        let participant = ceremony
            .last_completed()
            .ok_or(CoordinatorError::NoCompletedParticipant)?;

        fs::create_dir_all(&self.sealing_path).await?;
        let copied = self
            .store
            .copy_verified_to(&participant.address, &self.sealing_path)
            .await?;
        info!("Prepared {} transcripts of {} for sealing", copied, participant.address);

        if self.is_cancelled() {
            info!("Sealing was cancelled before the engine started");
            return Ok(());
        }

        self.transition(SealerState::Computing);
        self.compute().await?;

        // The outputs of an interrupted engine are incomplete and keep their engine names.
        if self.is_cancelled() {
            return Ok(());
        }

        self.transition(SealerState::RenamingOutputs);
        let renamed = self.rename_outputs().await?;
        info!("Sealing complete with {} sealed transcripts", renamed);
        Ok(())
    }

    /// Runs the engine to completion, forwarding its progress to subscribers.
    async fn compute(&self) -> Result<(), CoordinatorError> {
        info!(
            "Starting sealing engine {} in {}",
            self.engine_path.display(),
            self.sealing_path.display()
        );

        let mut child = Command::new(&self.engine_path)
            .arg(&self.sealing_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CoordinatorError::SealingEngineSpawn {
                path: self.engine_path.clone(),
                source,
            })?;

        let read_stdout = for_each_line(child.stdout.take(), |line| self.handle_engine_output(line));
        let read_stderr = for_each_line(child.stderr.take(), |line| warn!("From seal: {}", line));

        let wait = async {
            tokio::select! {
                status = child.wait() => status,
                _ = self.cancellation.notified() => {
                    interrupt(&mut child);
                    child.wait().await
                }
            }
        };

        let (_, _, status) = tokio::join!(read_stdout, read_stderr, wait);
        let status = status?;

        if status.success() || self.is_cancelled() {
            info!("Sealing engine complete or cancelled ({})", status);
            Ok(())
        } else {
            Err(CoordinatorError::SealingEngineFailed(status.code()))
        }
    }

    fn handle_engine_output(&self, line: &str) {
        debug!("From seal: {}", line);
        if let Some(EngineMessage::Progress(percentage)) = EngineMessage::parse(line) {
            // Subscribers that dropped their receiver are forgotten.
            lock(&self.subscribers).retain(|subscriber| subscriber.send(percentage).is_ok());
        }
    }

    /// Renames the contiguous run of engine outputs starting at 0 to their sealed names.
    async fn rename_outputs(&self) -> Result<u64, CoordinatorError> {
        let mut num = 0;
        loop {
            let output = self.sealing_path.join(TranscriptFile::sealing_output(num).file_name());
            if !path_exists(&output).await? {
                break;
            }
            let sealed = self.sealing_path.join(TranscriptFile::transcript(num).file_name());
            fs::rename(&output, &sealed).await?;
            num += 1;
        }
        Ok(num)
    }
}

///
/// Passes every line of `stream` to `handle` until end of file.
///
/// Bytes that are not valid UTF-8 are replaced. The pipe is drained until the
/// engine closes it, so the engine never writes into a closed pipe.
///
async fn for_each_line<R>(stream: Option<R>, mut handle: impl FnMut(&str))
where
    R: AsyncRead + Unpin,
{
    let mut reader = match stream {
        Some(stream) => BufReader::new(stream),
        None => return,
    };

    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer);
                handle(line.trim_end_matches(&['\n', '\r'][..]));
            }
            Err(error) => {
                warn!("Failed to read sealing engine output: {}", error);
                break;
            }
        }
    }
}

/// Sends an interrupt to the engine. An engine that already exited is left alone.
#[cfg(unix)]
fn interrupt(child: &mut Child) {
    use nix::{
        errno::Errno,
        sys::signal::{kill, Signal},
        unistd::Pid,
    };

    let pid = match child.id() {
        Some(pid) => pid,
        None => {
            debug!("Sealing engine already exited");
            return;
        }
    };

    match kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
        Ok(()) => info!("Interrupted sealing engine (pid {})", pid),
        Err(Errno::ESRCH) => debug!("Sealing engine already exited"),
        Err(error) => warn!("Failed to interrupt sealing engine (pid {}): {}", pid, error),
    }
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child) {
    if let Err(error) = child.start_kill() {
        debug!("Sealing engine already exited: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        commands::{Sealer, SealerState},
        locators::Locator,
        objects::{CeremonyState, Identity, ParticipantRecord, ParticipantState},
        storage::TranscriptStore,
        testing::prelude::*,
        CoordinatorError,
    };

    use std::{path::PathBuf, sync::Arc, time::Duration};

    const MISSING_ENGINE: &str = "/nonexistent/sealing-engine";

    fn ceremony(participants: &[(&str, ParticipantState)]) -> CeremonyState {
        CeremonyState::new(
            participants
                .iter()
                .map(|(address, state)| ParticipantRecord::new(Identity::new(address).unwrap(), *state))
                .collect(),
        )
    }

    /// Creates a store where `0xalice` has `count` verified transcripts.
    async fn verified_store(count: u64) -> anyhow::Result<TestStore> {
        let test = TestStore::new();
        let alice = Identity::new("0xalice")?;
        test.save_transcripts(&alice, count).await?;
        test.store.make_live(&alice).await?;
        Ok(test)
    }

    fn sealed_files(test: &TestStore) -> Vec<String> {
        let mut names = std::fs::read_dir(test.store.sealing_path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_run_without_completed_participant() -> anyhow::Result<()> {
        let test = verified_store(2).await?;
        let sealer = Sealer::new(Arc::new(test.store.clone()), MISSING_ENGINE);

        let state = ceremony(&[("0xalice", ParticipantState::Running), ("0xbob", ParticipantState::Waiting)]);
        match sealer.run(&state).await {
            Err(CoordinatorError::NoCompletedParticipant) => {}
            other => panic!("unexpected result {:?}", other),
        }

        assert!(sealed_files(&test).is_empty());
        assert_eq!(SealerState::Failed, sealer.state());
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_before_run() -> anyhow::Result<()> {
        let test = verified_store(2).await?;
        let sealer = Sealer::new(Arc::new(test.store.clone()), MISSING_ENGINE);

        let mut progress = sealer.subscribe();
        sealer.cancel();
        sealer.cancel();
        assert_eq!(None, progress.recv().await);

        // The engine path does not exist, so success shows it was never spawned.
        sealer.run(&ceremony(&[("0xalice", ParticipantState::Complete)])).await?;

        assert_eq!(SealerState::Cancelled, sealer.state());
        assert_eq!(vec!["transcript0.dat", "transcript1.dat"], sealed_files(&test));
        Ok(())
    }

    #[tokio::test]
    async fn test_subscribe_after_cancel_is_closed() {
        let test = TestStore::new();
        let sealer = Sealer::new(Arc::new(test.store.clone()), MISSING_ENGINE);
        sealer.cancel();

        let mut progress = sealer.subscribe();
        assert_eq!(None, progress.recv().await);
    }

    #[tokio::test]
    async fn test_run_twice() -> anyhow::Result<()> {
        let test = verified_store(1).await?;
        let sealer = Sealer::new(Arc::new(test.store.clone()), MISSING_ENGINE);
        sealer.cancel();

        let state = ceremony(&[("0xalice", ParticipantState::Complete)]);
        sealer.run(&state).await?;
        assert!(matches!(
            sealer.run(&state).await,
            Err(CoordinatorError::SealerAlreadyStarted)
        ));
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_engine_spawn_failure() -> anyhow::Result<()> {
        let test = verified_store(1).await?;
        let sealer = Sealer::new(Arc::new(test.store.clone()), MISSING_ENGINE);

        match sealer.run(&ceremony(&[("0xalice", ParticipantState::Complete)])).await {
            Err(CoordinatorError::SealingEngineSpawn { path, .. }) => assert_eq!(PathBuf::from(MISSING_ENGINE), path),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(SealerState::Failed, sealer.state());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_seal_with_engine() -> anyhow::Result<()> {
        let test = verified_store(2).await?;
        let engine = write_engine_script(test.directory.path(), COPYING_ENGINE)?;
        let sealer = Sealer::new(Arc::new(test.store.clone()), engine);

        let mut progress = sealer.subscribe();
        let state = ceremony(&[
            ("0xbob", ParticipantState::Complete),
            ("0xalice", ParticipantState::Complete),
            ("0xcarol", ParticipantState::Invalidated),
        ]);
        sealer.run(&state).await?;

        assert_eq!(SealerState::Done, sealer.state());
        assert_eq!(vec!["transcript0.dat", "transcript1.dat"], sealed_files(&test));
        assert_eq!(
            "sealed transcript-1",
            std::fs::read_to_string(test.store.sealing_path().join("transcript1.dat"))?
        );

        // One event per progress line; the unknown command in between is ignored.
        assert_eq!(Some(50.0), progress.recv().await);
        assert_eq!(Some(100.0), progress.recv().await);
        assert!(progress.try_recv().is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_rename_stops_at_first_missing_output() -> anyhow::Result<()> {
        let test = verified_store(1).await?;
        let engine = write_engine_script(test.directory.path(), GAPPED_OUTPUT_ENGINE)?;
        let sealer = Sealer::new(Arc::new(test.store.clone()), engine);

        sealer.run(&ceremony(&[("0xalice", ParticipantState::Complete)])).await?;

        assert_eq!(
            vec!["transcript0.dat", "transcript1.dat", "transcript3_out.dat"],
            sealed_files(&test)
        );
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_engine_output_with_invalid_utf8() -> anyhow::Result<()> {
        let test = verified_store(1).await?;
        let engine = write_engine_script(test.directory.path(), INVALID_UTF8_ENGINE)?;
        let sealer = Sealer::new(Arc::new(test.store.clone()), engine);

        let mut progress = sealer.subscribe();
        sealer.run(&ceremony(&[("0xalice", ParticipantState::Complete)])).await?;

        assert_eq!(SealerState::Done, sealer.state());
        assert_eq!(Some(50.0), progress.recv().await);
        assert_eq!(Some(100.0), progress.recv().await);
        assert_eq!(vec!["transcript0.dat"], sealed_files(&test));
        assert_eq!(
            "output\n",
            std::fs::read_to_string(test.store.sealing_path().join("transcript0.dat"))?
        );
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_engine_failure() -> anyhow::Result<()> {
        let test = verified_store(1).await?;
        let engine = write_engine_script(test.directory.path(), FAILING_ENGINE)?;
        let sealer = Sealer::new(Arc::new(test.store.clone()), engine);

        match sealer.run(&ceremony(&[("0xalice", ParticipantState::Complete)])).await {
            Err(CoordinatorError::SealingEngineFailed(code)) => assert_eq!(Some(3), code),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(SealerState::Failed, sealer.state());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_cancel_during_compute() -> anyhow::Result<()> {
        let test = verified_store(1).await?;
        let engine = write_engine_script(test.directory.path(), HANGING_ENGINE)?;
        let sealer = Arc::new(Sealer::new(Arc::new(test.store.clone()), engine));

        let mut progress = sealer.subscribe();
        let run = {
            let sealer = sealer.clone();
            let state = ceremony(&[("0xalice", ParticipantState::Complete)]);
            tokio::spawn(async move { sealer.run(&state).await })
        };

        // The engine is running once it reports progress.
        assert_eq!(Some(10.0), progress.recv().await);
        assert_eq!(SealerState::Computing, sealer.state());

        sealer.cancel();
        assert_eq!(None, progress.recv().await);

        // The interrupted engine exits non-zero, which still counts as success.
        let result = tokio::time::timeout(Duration::from_secs(20), run).await??;
        result?;
        assert_eq!(SealerState::Cancelled, sealer.state());
        assert_eq!(vec!["transcript0.dat"], sealed_files(&test));
        Ok(())
    }
}
