//! Scripts selectable by name
//!
//! Worker processes rebuild their hooks from the script name in their
//! assignment, so every script a run can use has to be registered here.

use super::Scripting;
use crate::transport::JoinOptions;

/// Names accepted by [`resolve`]
pub const BUILTIN_SCRIPTS: &[&str] = &["idle", "chatty"];

/// Look up a built-in script by name
#[must_use]
pub fn resolve(name: &str) -> Option<Scripting> {
    match name {
        "idle" => Some(idle()),
        "chatty" => Some(chatty()),
        _ => None,
    }
}

/// Join and hold the session open, nothing else
#[must_use]
pub fn idle() -> Scripting {
    Scripting::new()
}

/// Named bot that greets the room and reports its lifecycle
#[must_use]
pub fn chatty() -> Scripting {
    Scripting::new()
        .request_join_options(|index| async move {
            let mut options = JoinOptions::new();
            options.insert("name".into(), bot_name(index).into());
            options
        })
        .on_join(|session| {
            let greeting = serde_json::json!({
                "type": "chat",
                "message": format!("hello from {}", bot_name(session.index())),
            });
            if let Err(e) = session.send(greeting.to_string()) {
                session.warn(format!("{}: greeting not sent: {}", bot_name(session.index()), e));
            }
        })
        .on_leave(|session, code| match code {
            Some(code) => session.log(format!("{} left ({})", bot_name(session.index()), code)),
            None => session.log(format!("{} left", bot_name(session.index()))),
        })
        .on_error(|session, error| {
            session.warn(format!("{} saw error: {}", bot_name(session.index()), error));
        })
}

fn bot_name(index: usize) -> String {
    format!("bot-{}", index)
}
