//! Recognition engine backed by a long-lived external program.
//!
//! The program is started once with the profile flags and stays up for the
//! life of the worker, so its models load exactly once. Requests and replies
//! travel over its standard streams in the line format described in
//! `engine::wire`. Its standard error is inherited, which puts engine
//! tracebacks on the worker's diagnostic stream.

use std::env;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use lector_config::Config;

use super::wire::{self, Handshake};
use super::{EngineError, EngineProfile, EngineProvider, EngineStartupError, RecognitionEngine};

const ENGINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::engine");

/// How long a closed engine may take to exit before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Provider that starts a [`CommandEngine`] for the configured program.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandEngineProvider;

impl EngineProvider for CommandEngineProvider {
    type Engine = CommandEngine;

    fn start_engine(
        &self,
        profile: &EngineProfile,
        config: &Config,
    ) -> Result<CommandEngine, EngineStartupError> {
        let program = resolve_program(config.engine_program())?;
        CommandEngine::start(program, profile)
    }
}

/// Engine that keeps one recognition program running and feeds it requests.
#[derive(Debug)]
pub struct CommandEngine {
    program: PathBuf,
    session: Mutex<EngineSession>,
}

impl CommandEngine {
    /// Launches `program` and waits for it to report ready.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineStartupError`] when the program cannot be spawned,
    /// exits before its handshake, or refuses to start.
    pub fn start(program: PathBuf, profile: &EngineProfile) -> Result<Self, EngineStartupError> {
        debug!(
            target: ENGINE_TARGET,
            program = %program.display(),
            arguments = ?profile.arguments(),
            "launching recognition engine"
        );

        let mut child = Command::new(&program)
            .args(profile.arguments())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| {
                EngineStartupError::with_source(
                    format!("failed to launch {}", program.display()),
                    source,
                )
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineStartupError::new(format!(
                "failed to capture the streams of {}",
                program.display()
            )));
        };

        let mut session = EngineSession {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        };
        session.handshake(&program)?;

        debug!(
            target: ENGINE_TARGET,
            program = %program.display(),
            pid = session.child.id(),
            "recognition engine ready"
        );
        Ok(Self {
            program,
            session: Mutex::new(session),
        })
    }

    /// Path of the program this engine runs.
    #[must_use]
    pub fn program(&self) -> &Path {
        self.program.as_path()
    }
}

impl RecognitionEngine for CommandEngine {
    fn recognise(&self, image: &Path) -> Result<Value, EngineError> {
        if !image.is_file() {
            return Err(EngineError::ImageNotFound {
                path: image.to_path_buf(),
            });
        }

        let request = wire::encode_request(image)?;
        debug!(
            target: ENGINE_TARGET,
            image = %image.display(),
            "running recognition"
        );

        // A panic mid-exchange leaves nothing half-written that a later
        // request could misread, so a poisoned lock is still usable.
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        session.exchange(&request)
    }
}

#[derive(Debug)]
struct EngineSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl EngineSession {
    fn handshake(&mut self, program: &Path) -> Result<(), EngineStartupError> {
        let mut line = String::new();
        let read = self.stdout.read_line(&mut line).map_err(|source| {
            EngineStartupError::with_source(
                format!("failed to read the handshake of {}", program.display()),
                source,
            )
        })?;

        if read == 0 {
            let status = match self.child.wait() {
                Ok(status) => status.to_string(),
                Err(error) => error.to_string(),
            };
            return Err(EngineStartupError::new(format!(
                "engine program {} exited during startup ({status})",
                program.display()
            )));
        }

        match wire::parse_handshake(&line) {
            Handshake::Ready => Ok(()),
            Handshake::Refused(message) => Err(EngineStartupError::new(message)),
            Handshake::Unrecognised(reply) => Err(EngineStartupError::new(format!(
                "engine program {} sent an unexpected handshake: {reply}",
                program.display()
            ))),
        }
    }

    fn exchange(&mut self, request: &[u8]) -> Result<Value, EngineError> {
        let stdin = self.stdin.as_mut().ok_or(EngineError::Closed)?;
        stdin
            .write_all(request)
            .and_then(|()| stdin.flush())
            .map_err(|source| EngineError::Io { source })?;

        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .map_err(|source| EngineError::Io { source })?;
        if read == 0 {
            self.stdin = None;
            return Err(EngineError::Closed);
        }
        wire::parse_reply(&line)
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        // End of input is the engine's signal to exit.
        drop(self.stdin.take());

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(target: ENGINE_TARGET, %status, "recognition engine exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL_INTERVAL),
                Ok(None) | Err(_) => break,
            }
        }

        warn!(
            target: ENGINE_TARGET,
            pid = self.child.id(),
            "recognition engine ignored end of input, killing it"
        );
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Resolves the configured program to a path.
///
/// Values containing a path separator are taken literally; bare names are
/// searched for on `PATH`.
fn resolve_program(program: &str) -> Result<PathBuf, EngineStartupError> {
    let trimmed = program.trim();
    if trimmed.is_empty() {
        return Err(EngineStartupError::new("no engine program configured"));
    }

    let candidate = Path::new(trimmed);
    if candidate.components().count() > 1 {
        return if candidate.is_file() {
            Ok(candidate.to_path_buf())
        } else {
            Err(EngineStartupError::new(format!(
                "engine program {trimmed} does not exist"
            )))
        };
    }

    env::var_os("PATH")
        .iter()
        .flat_map(env::split_paths)
        .map(|dir| dir.join(trimmed))
        .find(|path| path.is_file())
        .ok_or_else(|| EngineStartupError::new(format!("engine program {trimmed} not found on PATH")))
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::io::Cursor;
    use std::os::unix::fs::PermissionsExt;

    use rstest::{fixture, rstest};
    use serde_json::json;
    use tempfile::TempDir;

    use crate::engine::EngineHandle;
    use crate::health::StructuredHealthReporter;
    use crate::protocol::ProtocolLoop;

    use super::*;

    const DETECTIONS: &str =
        r#"{"result":[[[[1.5,2.0],[10.9,2.0],[10.9,8.7],[1.5,8.7]],["hello",0.98]]]}"#;

    struct FakeEngine {
        dir: TempDir,
    }

    impl FakeEngine {
        fn install(&self, body: &str) -> PathBuf {
            let path = self.dir.path().join("engine");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake engine");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("mark fake engine executable");
            path
        }

        /// Installs an engine that logs its starts, arguments and requests,
        /// then answers every request with `reply`.
        fn serving(&self, reply: &str) -> PathBuf {
            let dir = self.dir.path().display();
            self.install(&format!(
                "echo start >> '{dir}/starts'\n\
                 printf '%s\\n' \"$*\" > '{dir}/args'\n\
                 echo '{{\"ready\":true}}'\n\
                 while IFS= read -r line; do\n\
                 printf '%s\\n' \"$line\" >> '{dir}/requests'\n\
                 echo '{reply}'\n\
                 done\n\
                 echo stopped >> '{dir}/lifecycle'"
            ))
        }

        fn image(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, b"not really a png").expect("write image");
            path
        }

        fn log(&self, name: &str) -> Vec<String> {
            fs::read_to_string(self.dir.path().join(name))
                .unwrap_or_default()
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    #[fixture]
    fn fake() -> FakeEngine {
        FakeEngine {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    fn config_for(program: &Path) -> Config {
        Config {
            engine_program: program.display().to_string(),
            ..Config::default()
        }
    }

    fn start(program: PathBuf) -> CommandEngine {
        CommandEngine::start(program, &EngineProfile::STANDARD).expect("engine should start")
    }

    #[rstest]
    fn provider_starts_engine_with_profile_flags(fake: FakeEngine) {
        let program = fake.serving(DETECTIONS);
        let engine = CommandEngineProvider
            .start_engine(&EngineProfile::STANDARD, &config_for(&program))
            .expect("engine should start");
        assert_eq!(engine.program(), program.as_path());
        assert_eq!(
            fake.log("args"),
            vec!["--lang ch --use-angle-cls true --show-log false"]
        );
    }

    #[rstest]
    fn provider_reports_refused_handshake(fake: FakeEngine) {
        let program =
            fake.install("echo '{\"error\":\"No module named paddleocr\"}'\nexit 3");
        let error = CommandEngineProvider
            .start_engine(&EngineProfile::STANDARD, &config_for(&program))
            .expect_err("engine should refuse");
        assert_eq!(error.message(), "No module named paddleocr");
    }

    #[rstest]
    fn provider_reports_exit_before_handshake(fake: FakeEngine) {
        let program = fake.install("exit 4");
        let error = CommandEngineProvider
            .start_engine(&EngineProfile::STANDARD, &config_for(&program))
            .expect_err("engine should fail");
        assert!(error.message().contains("exited during startup"), "{error}");
    }

    #[rstest]
    fn provider_reports_unexpected_handshake(fake: FakeEngine) {
        let program = fake.install("echo 'Downloading model'\ncat > /dev/null");
        let error = CommandEngineProvider
            .start_engine(&EngineProfile::STANDARD, &config_for(&program))
            .expect_err("handshake should be rejected");
        assert!(error.message().contains("Downloading model"), "{error}");
    }

    #[rstest]
    fn provider_reports_missing_program(fake: FakeEngine) {
        let program = fake.dir.path().join("absent");
        let error = CommandEngineProvider
            .start_engine(&EngineProfile::STANDARD, &config_for(&program))
            .expect_err("missing program");
        assert!(error.message().contains("does not exist"));
    }

    #[test]
    fn bare_names_are_searched_on_path() {
        let error = resolve_program("lector-definitely-not-installed")
            .expect_err("program should not resolve");
        assert!(error.message().contains("not found on PATH"));
    }

    #[rstest]
    fn engine_is_started_once_for_many_requests(fake: FakeEngine) {
        let engine = CommandEngineProvider
            .start_engine(&EngineProfile::STANDARD, &config_for(&fake.serving(DETECTIONS)))
            .expect("engine should start");
        let handle = EngineHandle::Available(engine);
        let input: String = (1..=3)
            .map(|index| {
                let image = fake.image(&format!("page-{index}.png"));
                format!("{}\n", json!({"cmd": "ocr", "image_path": image, "id": index}))
            })
            .collect();

        let reporter = StructuredHealthReporter::new();
        let mut output = Vec::new();
        ProtocolLoop::new(&handle, &reporter)
            .run(Cursor::new(input.into_bytes()), &mut output)
            .expect("session should complete");

        let text = String::from_utf8(output).expect("utf8 output");
        let replies: Vec<Value> = text
            .lines()
            .skip(1)
            .map(|line| serde_json::from_str(line).expect("json reply"))
            .collect();
        assert_eq!(replies.len(), 3);
        assert!(replies.iter().all(|reply| reply["status"] == "ok"), "{text}");
        assert_eq!(fake.log("starts").len(), 1, "engine constructions");
        assert_eq!(fake.log("requests").len(), 3);
    }

    #[rstest]
    fn image_paths_are_sent_verbatim(fake: FakeEngine) {
        let engine = start(fake.serving(DETECTIONS));
        let image = fake.image("-scan.png");

        let raw = engine.recognise(&image).expect("recognition");

        assert_eq!(raw, json!([[[[1.5, 2.0], [10.9, 2.0], [10.9, 8.7], [1.5, 8.7]], ["hello", 0.98]]]));
        let requests = fake.log("requests");
        let sent: Value = serde_json::from_str(&requests[0]).expect("request json");
        assert_eq!(sent, json!({"image_path": image}));
        assert_eq!(
            fake.log("args"),
            vec!["--lang ch --use-angle-cls true --show-log false"]
        );
    }

    #[rstest]
    fn engine_failure_reply_is_reported(fake: FakeEngine) {
        let engine = start(fake.serving(r#"{"error":"RuntimeError: cuda"}"#));
        let error = engine
            .recognise(&fake.image("page.png"))
            .expect_err("engine failure");
        assert!(matches!(error, EngineError::Failed { .. }));
        assert_eq!(error.to_string(), "recognition engine failed: RuntimeError: cuda");
    }

    #[rstest]
    fn engine_exit_mid_session_is_reported(fake: FakeEngine) {
        let engine = start(fake.install("echo '{\"ready\":true}'\nread line\nexit 0"));
        let image = fake.image("page.png");

        let first = engine.recognise(&image).expect_err("engine exited");
        let second = engine.recognise(&image).expect_err("engine still gone");

        assert!(matches!(first, EngineError::Closed));
        assert!(matches!(second, EngineError::Closed));
    }

    #[rstest]
    fn missing_image_is_rejected_before_the_engine_sees_it(fake: FakeEngine) {
        let engine = start(fake.serving(DETECTIONS));
        let error = engine
            .recognise(&fake.dir.path().join("missing.png"))
            .expect_err("missing image");
        assert!(matches!(error, EngineError::ImageNotFound { .. }));
        assert!(fake.log("requests").is_empty());
    }

    #[rstest]
    fn undecodable_reply_is_rejected(fake: FakeEngine) {
        let engine = start(fake.serving("PaddleOCR banner"));
        let error = engine
            .recognise(&fake.image("page.png"))
            .expect_err("bad output");
        assert!(matches!(error, EngineError::Decode { .. }));
    }

    #[rstest]
    fn dropping_the_engine_closes_the_program(fake: FakeEngine) {
        let engine = start(fake.serving(DETECTIONS));
        drop(engine);
        assert_eq!(fake.log("lifecycle"), vec!["stopped"]);
    }
}
