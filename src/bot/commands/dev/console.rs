//! Script console backing the `eval` command.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use log::debug;
use rhai::Dynamic;
use rhai::Engine;
use rhai::EvalAltResult;
use rhai::Scope;

/// Discord ids exposed to a script.
#[derive(Clone, Copy, Debug, Default)]
pub struct EvalScope {
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub author_id: u64,
    pub message_id: u64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum EvalOutcome {
    /// The script produced a value, kept as `__` for the next eval.
    Value { output: String, value: String },
    /// The script finished without a value.
    Unit { output: String },
    Failed { output: String, error: String },
    Cancelled,
}

/// Runs scripts one at a time and remembers the last result.
pub struct EvalConsole {
    last_result: Arc<Mutex<Dynamic>>,
    running: Mutex<Option<Arc<AtomicBool>>>,
}

impl EvalConsole {
    pub fn new() -> Self {
        Self {
            last_result: Arc::new(Mutex::new(Dynamic::UNIT)),
            running: Mutex::new(None),
        }
    }

    pub async fn eval(&self, code: String, ids: EvalScope) -> anyhow::Result<EvalOutcome> {
        let cancel = Arc::new(AtomicBool::new(false));
        if let Ok(mut running) = self.running.lock() {
            *running = Some(cancel.clone());
        }

        let last_result = self.last_result.clone();
        let task_cancel = cancel.clone();
        let outcome =
            tokio::task::spawn_blocking(move || run_script(&code, ids, last_result, task_cancel))
                .await;

        if let Ok(mut running) = self.running.lock() {
            if running.as_ref().is_some_and(|c| Arc::ptr_eq(c, &cancel)) {
                *running = None;
            }
        }
        Ok(outcome?)
    }

    /// Cancels the running script. Returns `false` if none is running.
    pub fn stop(&self) -> bool {
        let Ok(mut running) = self.running.lock() else {
            return false;
        };
        match running.take() {
            Some(cancel) => {
                cancel.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }
}

fn run_script(
    code: &str,
    ids: EvalScope,
    last_result: Arc<Mutex<Dynamic>>,
    cancel: Arc<AtomicBool>,
) -> EvalOutcome {
    let output = Arc::new(Mutex::new(String::new()));

    let mut engine = Engine::new();
    let printed = output.clone();
    engine.on_print(move |text| {
        if let Ok(mut out) = printed.lock() {
            out.push_str(text);
            out.push('\n');
        }
    });
    let debugged = output.clone();
    engine.on_debug(move |text, _source, pos| {
        if let Ok(mut out) = debugged.lock() {
            out.push_str(&format!("{pos:?} | {text}\n"));
        }
    });
    engine.on_progress(move |_ops| {
        cancel
            .load(Ordering::Relaxed)
            .then_some(Dynamic::UNIT)
    });

    let previous = last_result
        .lock()
        .map(|value| value.clone())
        .unwrap_or(Dynamic::UNIT);
    let mut scope = Scope::new();
    scope.push("guild_id", ids.guild_id.map(|id| id as i64).unwrap_or(0));
    scope.push("channel_id", ids.channel_id as i64);
    scope.push("author_id", ids.author_id as i64);
    scope.push("message_id", ids.message_id as i64);
    scope.push_dynamic("__", previous);

    let result = engine.eval_with_scope::<Dynamic>(&mut scope, code);
    let output = output.lock().map(|o| o.clone()).unwrap_or_default();

    match result {
        Ok(value) if value.is_unit() => EvalOutcome::Unit { output },
        Ok(value) => {
            let shown = value.to_string();
            if let Ok(mut last) = last_result.lock() {
                *last = value;
            }
            EvalOutcome::Value {
                output,
                value: shown,
            }
        }
        Err(err) if matches!(*err, EvalAltResult::ErrorTerminated(..)) => {
            debug!("Eval terminated");
            EvalOutcome::Cancelled
        }
        Err(err) => EvalOutcome::Failed {
            output,
            error: err.to_string(),
        },
    }
}

/// Strips a surrounding code fence or inline backticks.
pub fn cleanup_code(content: &str) -> String {
    if content.starts_with("```") && content.ends_with("```") && content.len() > 3 {
        let lines: Vec<&str> = content.split('\n').collect();
        if lines.len() < 2 {
            return String::new();
        }
        return lines[1..lines.len() - 1].join("\n");
    }
    content
        .trim_matches(|c| c == '`' || c == ' ' || c == '\n')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_code() {
        assert_eq!(cleanup_code("```rust\nlet x = 1;\nx\n```"), "let x = 1;\nx");
        assert_eq!(cleanup_code("`1 + 2`"), "1 + 2");
        assert_eq!(cleanup_code(" 40 + 2\n"), "40 + 2");
    }

    #[tokio::test]
    async fn test_eval_keeps_last_result() {
        let console = EvalConsole::new();
        let outcome = console.eval("40 + 1".to_string(), EvalScope::default()).await.unwrap();
        assert_eq!(
            outcome,
            EvalOutcome::Value {
                output: String::new(),
                value: "41".to_string()
            }
        );

        let outcome = console.eval("__ + 1".to_string(), EvalScope::default()).await.unwrap();
        assert_eq!(
            outcome,
            EvalOutcome::Value {
                output: String::new(),
                value: "42".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_eval_captures_print_and_scope() {
        let console = EvalConsole::new();
        let ids = EvalScope {
            author_id: 7,
            ..Default::default()
        };
        let outcome = console.eval("print(author_id);".to_string(), ids).await.unwrap();
        assert_eq!(
            outcome,
            EvalOutcome::Unit {
                output: "7\n".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_eval_reports_errors() {
        let console = EvalConsole::new();
        let outcome = console.eval("undefined_fn()".to_string(), EvalScope::default()).await.unwrap();
        assert!(matches!(outcome, EvalOutcome::Failed { .. }));
    }

    #[test]
    fn test_stop_without_running_eval() {
        assert!(!EvalConsole::new().stop());
    }
}
