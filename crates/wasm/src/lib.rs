use std::sync::{Mutex, MutexGuard};

use calltrace_core::{ProfileSession, TreeConfig};
use calltrace_protocol::TraversalDirection;
use wasm_bindgen::prelude::*;

/// Loaded sessions, addressed by handle. Unloading leaves a hole so later
/// handles stay valid.
static SESSIONS: Mutex<Vec<Option<ProfileSession>>> = Mutex::new(Vec::new());

fn sessions() -> Result<MutexGuard<'static, Vec<Option<ProfileSession>>>, String> {
    SESSIONS
        .lock()
        .map_err(|_| "session registry poisoned".to_string())
}

fn parse_view(view: &str) -> Result<TraversalDirection, String> {
    TraversalDirection::parse(view).ok_or_else(|| format!("unknown view: {view}"))
}

fn with_session<T>(
    handle: usize,
    f: impl FnOnce(&mut ProfileSession) -> T,
) -> Result<T, String> {
    let mut sessions = sessions()?;
    let session = sessions
        .get_mut(handle)
        .and_then(Option::as_mut)
        .ok_or_else(|| "invalid profile handle".to_string())?;
    Ok(f(session))
}

fn rows_json(session: &ProfileSession, view: TraversalDirection) -> Result<String, String> {
    serde_json::to_string(&session.rows(view)).map_err(|e| e.to_string())
}

fn load(data: &[u8], label: &str, config_json: Option<&str>) -> Result<usize, String> {
    let config = match config_json {
        Some(json) => serde_json::from_str(json).map_err(|e| format!("invalid config: {e}"))?,
        None => TreeConfig::default(),
    };
    let session = ProfileSession::load(data, label, config).map_err(|e| e.to_string())?;
    let mut sessions = sessions()?;
    sessions.push(Some(session));
    Ok(sessions.len() - 1)
}

fn command(
    handle: usize,
    view: &str,
    f: impl FnOnce(&mut ProfileSession, TraversalDirection) -> Result<(), String>,
) -> Result<String, String> {
    let view = parse_view(view)?;
    with_session(handle, |session| {
        f(session, view)?;
        rows_json(session, view)
    })?
}

fn toggle_row(
    session: &mut ProfileSession,
    view: TraversalDirection,
    row_id: &str,
) -> Result<(), String> {
    if session.toggle(view, row_id) {
        Ok(())
    } else {
        Err(format!("unknown row id: {row_id}"))
    }
}

/// Decode a profile payload and build both views. Returns a handle for the
/// other calls. A corrupt payload fails the load as a whole.
#[wasm_bindgen]
pub fn load_profile(
    data: &[u8],
    label: &str,
    config_json: Option<String>,
) -> Result<usize, JsError> {
    load(data, label, config_json.as_deref()).map_err(|e| JsError::new(&e))
}

/// Drop a session. Its handle is not reused.
#[wasm_bindgen]
pub fn unload_profile(handle: usize) -> Result<(), JsError> {
    let mut sessions = sessions().map_err(|e| JsError::new(&e))?;
    match sessions.get_mut(handle) {
        Some(slot) => {
            *slot = None;
            Ok(())
        }
        None => Err(JsError::new("invalid profile handle")),
    }
}

/// Visible rows of `view` (`"hot-methods"` or `"call-tree"`) as JSON.
#[wasm_bindgen]
pub fn rows(handle: usize, view: &str) -> Result<String, JsError> {
    command(handle, view, |_, _| Ok(())).map_err(|e| JsError::new(&e))
}

/// Rebuild `view` from its first layer, keeping open state.
#[wasm_bindgen]
pub fn materialize(handle: usize, view: &str) -> Result<String, JsError> {
    command(handle, view, |session, view| {
        let (table, tree) = session.view_mut(view);
        tree.materialize(table);
        Ok(())
    })
    .map_err(|e| JsError::new(&e))
}

#[wasm_bindgen]
pub fn toggle(handle: usize, view: &str, row_id: &str) -> Result<String, JsError> {
    command(handle, view, |session, view| toggle_row(session, view, row_id))
        .map_err(|e| JsError::new(&e))
}

#[wasm_bindgen]
pub fn set_filter(handle: usize, view: &str, text: &str) -> Result<String, JsError> {
    command(handle, view, |session, view| {
        session.set_filter(view, text);
        Ok(())
    })
    .map_err(|e| JsError::new(&e))
}

#[wasm_bindgen]
pub fn highlight(handle: usize, view: &str, row_id: &str) -> Result<String, JsError> {
    command(handle, view, |session, view| {
        session.highlight(view, row_id);
        Ok(())
    })
    .map_err(|e| JsError::new(&e))
}

/// Get the number of decoded frames, synthetic root included.
#[wasm_bindgen]
pub fn get_frame_count(handle: usize) -> Result<usize, JsError> {
    with_session(handle, |session| session.table().len()).map_err(|e| JsError::new(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use calltrace_protocol::TreeRow;

    const PAYLOAD: &[u8] = br#"{
        "aggregated_samples": { "frame_nodes": [
            [0, 2, 0, [10, 0]],
            [1, 0, 1, [4, 4]],
            [2, 1, 2, [6, 0]],
            [3, 0, 3, [6, 6]]
        ] },
        "method_lookup": ["~ROOT~", "a.A.run ()V", "b.B.call ()V", "c.C.spin (J)V"]
    }"#;

    fn decode(json: &str) -> Vec<TreeRow> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn commands_return_visible_rows() {
        let handle = load(PAYLOAD, "sample", None).unwrap();
        let hot = decode(&command(handle, "hot-methods", |_, _| Ok(())).unwrap());
        assert_eq!(hot.len(), 2);
        assert_eq!(hot[0].label, "c.C.spin (J)V");

        let calls = decode(
            &command(handle, "call-tree", |s, v| toggle_row(s, v, "2:2"))
            .unwrap(),
        );
        let ids: Vec<&str> = calls.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2:2", "2:2->3:3", "1:1"]);
    }

    #[test]
    fn config_json_sets_indent_steps() {
        let handle = load(PAYLOAD, "sample", Some(r#"{"major_indent": 2}"#)).unwrap();
        let calls = decode(
            &command(handle, "call", |s, v| toggle_row(s, v, "2:2"))
            .unwrap(),
        );
        assert_eq!(calls[1].indent, 2);
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(load(b"{", "broken", None).is_err());
        assert!(load(PAYLOAD, "sample", Some("42")).is_err());
        let handle = load(PAYLOAD, "sample", None).unwrap();
        assert!(parse_view("flame").is_err());
        assert!(command(handle, "sideways", |_, _| Ok(())).is_err());
        assert!(with_session(usize::MAX, |_| ()).is_err());
    }

    #[test]
    fn toggling_an_unknown_row_is_an_error() {
        let handle = load(PAYLOAD, "sample", None).unwrap();
        let err = command(handle, "call-tree", |s, v| toggle_row(s, v, "9:9")).unwrap_err();
        assert_eq!(err, "unknown row id: 9:9");
        // The view is left as it was.
        let calls = decode(&command(handle, "call-tree", |_, _| Ok(())).unwrap());
        assert_eq!(calls.len(), 2);
    }
}
