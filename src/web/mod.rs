//! Web server for the interactive playground.
//!
//! Each session has its own editor contents and memory grid.
//! Memory survives between runs until the session is reset or discarded.

use crate::data::{Cell, Memory};
use crate::eval::{run_with_config, EvalConfig};
use crate::reader::read;
use crate::render::{parse_cell_field, render_memory};
use axum::extract::{Form, Path};
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const STYLE: &[u8] = include_bytes!("style.css");

/// Program shown in the editor of a new session.
pub const SAMPLE_PROGRAM: &str = include_str!("sample.micro");
const SAMPLE_START: &str = "bake_cake";

/// Sessions idle for this long are discarded.
const SESSION_IDLE: Duration = Duration::from_secs(60 * 60);

/// Memory of a new or reset session.
pub fn initial_memory() -> Memory {
    [((1, 1), 1i64), ((2, 1), 1), ((3, 1), 1)]
        .into_iter()
        .collect()
}

/// Fields submitted from the session page, in document order.
type Fields = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    Success(String),
    Error(String),
}

struct Session {
    name: String,

    /// Last active time of this session.
    /// Sessions are eventually discarded.
    last_active: Instant,

    code: String,
    start: String,
    memory: Memory,

    /// Result of the last action, if any.
    output: Option<Output>,
}

impl Session {
    fn new(name: String) -> Self {
        Session {
            name,
            last_active: Instant::now(),
            code: SAMPLE_PROGRAM.to_owned(),
            start: SAMPLE_START.to_owned(),
            memory: initial_memory(),
            output: None,
        }
    }

    /// Keep the editor contents from the form.
    fn take_editor(&mut self, fields: &Fields) {
        for (name, value) in fields {
            match name.as_str() {
                "code" => self.code = value.clone(),
                "start" => self.start = value.trim().to_owned(),
                _ => (),
            }
        }
    }

    /// Store each edited grid cell back into memory.
    ///
    /// The whole grid is submitted; a cell whose text matches what was
    /// rendered is unedited and keeps its value (or stays unset).
    fn apply_edits(&mut self, fields: &Fields) {
        for (name, value) in fields {
            let Some((row, col)) = parse_cell_field(name) else {
                continue;
            };
            let shown = self
                .memory
                .cell(row, col)
                .map(ToString::to_string)
                .unwrap_or_default();
            if *value != shown {
                self.memory.set(row, col, Cell::from_input(value));
            }
        }
    }

    /// Apply the form, then run the start program over this session's memory.
    fn run(&mut self, fields: &Fields, config: EvalConfig) {
        self.take_editor(fields);
        self.apply_edits(fields);
        self.output = Some(match self.execute(config) {
            Ok(()) => Output::Success(format!("program '{}' ran successfully", self.start)),
            Err(e) => Output::Error(e),
        });
    }

    fn execute(&mut self, config: EvalConfig) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("the code editor is empty".to_owned());
        }
        if self.start.is_empty() {
            return Err("a start program is required".to_owned());
        }
        let programs = read(&self.code).map_err(|e| e.to_string())?;
        run_with_config(&programs, &self.start, &mut self.memory, config)
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn reset(&mut self, fields: &Fields) {
        self.take_editor(fields);
        self.memory = initial_memory();
        self.output = Some(Output::Success(
            "memory reset to its initial values".to_owned(),
        ));
    }

    fn render(&self) -> maud::Markup {
        let run_action = format!("/sessions/{}/run", self.name);
        let reset_action = format!("/sessions/{}/reset", self.name);
        maud::html!(
                (maud::DOCTYPE)
                html {
                    head {
                        title { "micro-lang: " (self.name) }
                        link rel="stylesheet" href="/style.css";
                    }
                    body {
                        main {
                            h1 { "micro-lang playground" }
                            form method="post" action=(run_action) {
                                textarea id="code" name="code" rows="24" spellcheck="false" { (self.code) }
                                div class="controls" {
                                    label for="start" { "Start program" }
                                    input type="text" id="start" name="start" value=(self.start);
                                    button type="submit" { "Run" }
                                    button type="submit" formaction=(reset_action) { "Reset memory" }
                                }
                                div id="memory-grid" { (render_memory(&self.memory)) }
                            }
                            @match &self.output {
                                Some(Output::Success(msg)) => div id="output" class="success" { (msg) },
                                Some(Output::Error(msg)) => div id="output" class="error" { (msg) },
                                None => {},
                            }
                        }
                    }
                }
        )
    }
}

type SessionPtr = Arc<Mutex<Session>>;

#[derive(Clone)]
struct SessionHandler {
    sessions: Arc<Mutex<HashMap<String, SessionPtr>>>,
    config: EvalConfig,
}

impl SessionHandler {
    /// Find or create the named session, discarding any that have gone idle.
    async fn session(&self, name: String) -> SessionPtr {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        // A session that is locked is in use, so it isn't idle.
        sessions.retain(|_, session| {
            session
                .try_lock()
                .map(|s| s.last_active.elapsed() < SESSION_IDLE)
                .unwrap_or(true)
        });
        if sessions.len() < before {
            tracing::debug!("discarded {} idle sessions", before - sessions.len());
        }
        sessions
            .entry(name.clone())
            .or_insert_with(|| {
                tracing::info!(session = %name, "new session");
                Arc::new(Mutex::new(Session::new(name)))
            })
            .clone()
    }

    async fn new_session() -> Redirect {
        let name = format!("{:016x}", rand::thread_rng().gen::<u64>());
        Redirect::temporary(&format!("/sessions/{name}"))
    }

    async fn get(
        sessions: axum::extract::State<SessionHandler>,
        Path(session): Path<String>,
    ) -> impl IntoResponse {
        let session_ptr = sessions.0.session(session).await;
        // We have an arc, wait until we're the only thread working on this session.
        let mut session = session_ptr.lock().await;
        session.last_active = Instant::now();
        session.render()
    }

    async fn run(
        sessions: axum::extract::State<SessionHandler>,
        Path(session): Path<String>,
        Form(fields): Form<Fields>,
    ) -> Redirect {
        let session_ptr = sessions.0.session(session).await;
        let mut session = session_ptr.lock().await;
        session.last_active = Instant::now();
        session.run(&fields, sessions.0.config);
        match &session.output {
            Some(Output::Error(e)) => {
                tracing::info!(session = %session.name, start = %session.start, error = %e, "run failed")
            }
            _ => tracing::info!(session = %session.name, start = %session.start, "run complete"),
        }
        Redirect::to(&format!("/sessions/{}", session.name))
    }

    async fn reset(
        sessions: axum::extract::State<SessionHandler>,
        Path(session): Path<String>,
        Form(fields): Form<Fields>,
    ) -> Redirect {
        let session_ptr = sessions.0.session(session).await;
        let mut session = session_ptr.lock().await;
        session.last_active = Instant::now();
        session.reset(&fields);
        tracing::info!(session = %session.name, "memory reset");
        Redirect::to(&format!("/sessions/{}", session.name))
    }
}

/// Build the playground router. Runs are bounded by `config`.
pub fn get_server(config: EvalConfig) -> axum::Router {
    let sessions = SessionHandler {
        sessions: Default::default(),
        config,
    };

    axum::Router::new()
        .route("/", get(SessionHandler::new_session))
        .route(
            "/style.css",
            get(|| async { ([(axum::http::header::CONTENT_TYPE, "text/css")], STYLE) }),
        )
        .route("/sessions/:session", get(SessionHandler::get))
        .route("/sessions/:session/run", post(SessionHandler::run))
        .route("/sessions/:session/reset", post(SessionHandler::reset))
        .with_state(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn sample_bakes_a_cake() {
        let mut session = Session::new("test".to_owned());
        let form = fields(&[("code", SAMPLE_PROGRAM), ("start", SAMPLE_START)]);
        session.run(&form, EvalConfig::default());

        assert_eq!(
            session.output,
            Some(Output::Success("program 'bake_cake' ran successfully".to_owned()))
        );
        assert_eq!(session.memory.get(5, 1), Cell::String("cake".to_owned()));
        assert_eq!(session.memory.get(2, 1), Cell::Number(0));
    }

    #[test]
    fn edits_apply_before_run() {
        let mut session = Session::new("test".to_owned());
        // The baker is not ready: no cake.
        let form = fields(&[
            ("code", SAMPLE_PROGRAM),
            ("start", " bake_cake "),
            ("cell-1-1", ""),
            ("cell-2-1", "1"),
            ("cell-3-1", "many"),
        ]);
        session.run(&form, EvalConfig::default());

        assert!(matches!(session.output, Some(Output::Success(_))));
        assert_eq!(session.start, "bake_cake");
        assert_eq!(session.memory.get(1, 1), Cell::Number(0));
        assert_eq!(session.memory.get(3, 1), Cell::String("many".to_owned()));
        assert!(session.memory.cell(5, 1).is_none());
    }

    /// The form fields a browser would submit for the page as rendered.
    fn grid_fields(session: &Session) -> Fields {
        let cols = session.memory.columns();
        session
            .memory
            .rows()
            .flat_map(|row| cols.iter().map(move |&col| (row, col)))
            .map(|(row, col)| {
                let shown = session
                    .memory
                    .cell(row, col)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                (crate::render::cell_field_name(row, col), shown)
            })
            .collect()
    }

    #[test]
    fn unedited_cells_keep_their_values() {
        let code = r#"
            program P
                write [1,3] := "5"
            program-end
            program Q
                call-if [1,3] = 5, R
            program-end
            program R
                write [9,9] := 9
            program-end
        "#;
        let mut session = Session::new("test".to_owned());
        session.run(&fields(&[("code", code), ("start", "P")]), EvalConfig::default());
        assert!(matches!(session.output, Some(Output::Success(_))));

        // Resubmit the grid unchanged.
        let mut form = fields(&[("code", code), ("start", "Q")]);
        form.extend(grid_fields(&session));
        assert!(form.iter().any(|(k, v)| k == "cell-2-3" && v.is_empty()));
        session.run(&form, EvalConfig::default());

        match &session.output {
            Some(Output::Error(e)) => assert!(e.contains("comparisons need numbers"), "{e}"),
            v => panic!("unexpected output: {v:?}"),
        }
        assert_eq!(session.memory.cell(1, 3), Some(&Cell::String("5".to_owned())));
        assert_eq!(session.memory.cell(2, 3), None);
        assert_eq!(session.memory.cell(9, 9), None);
    }

    #[test]
    fn errors_are_reported() {
        let mut session = Session::new("test".to_owned());

        session.run(&fields(&[("code", "  "), ("start", "x")]), EvalConfig::default());
        assert_eq!(
            session.output,
            Some(Output::Error("the code editor is empty".to_owned()))
        );

        session.run(&fields(&[("code", SAMPLE_PROGRAM), ("start", "")]), EvalConfig::default());
        assert_eq!(
            session.output,
            Some(Output::Error("a start program is required".to_owned()))
        );

        session.run(
            &fields(&[("code", "program P write"), ("start", "P")]),
            EvalConfig::default(),
        );
        match &session.output {
            Some(Output::Error(e)) => assert!(e.contains("address is missing"), "{e}"),
            v => panic!("unexpected output: {v:?}"),
        }

        session.run(
            &fields(&[("code", "program P write [4,4] := 4 call Q program-end"), ("start", "P")]),
            EvalConfig::default(),
        );
        match &session.output {
            Some(Output::Error(e)) => assert!(e.contains("'Q' does not exist"), "{e}"),
            v => panic!("unexpected output: {v:?}"),
        }
        // The write before the failure stays.
        assert_eq!(session.memory.get(4, 4), Cell::Number(4));
    }

    #[test]
    fn reset_restores_memory() {
        let mut session = Session::new("test".to_owned());
        session.run(
            &fields(&[("code", "program P write [7,7] := 7 program-end"), ("start", "P")]),
            EvalConfig::default(),
        );
        assert_eq!(session.memory.get(7, 7), Cell::Number(7));

        session.reset(&fields(&[("code", "; kept"), ("start", "P"), ("cell-1-1", "9")]));
        assert_eq!(session.memory, initial_memory());
        assert_eq!(session.code, "; kept");
    }

    #[test]
    fn render_page() {
        let mut session = Session::new("abc".to_owned());
        session.output = Some(Output::Error("bad <input>".to_owned()));
        let html = session.render().into_string();
        assert!(html.contains(r#"action="/sessions/abc/run""#), "{html}");
        assert!(html.contains(r#"formaction="/sessions/abc/reset""#), "{html}");
        assert!(html.contains(r#"name="cell-3-1""#), "{html}");
        assert!(html.contains("program bake_cake"), "{html}");
        assert!(html.contains(r#"class="error""#), "{html}");
        assert!(html.contains("bad &lt;input&gt;"), "{html}");
    }
}
