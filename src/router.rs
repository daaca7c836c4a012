//! Command routing: context handlers first, global table second.
//!
//! A delivered phrase is first offered to the handler registered for the
//! active context (a screen synthesizing input on its own named controls).
//! If no handler claims it, the phrase falls through to a fixed global
//! table where several synonyms map to one action. Protected actions are
//! gated on the auth session flag; a denial is silent from the user's
//! point of view and shows up only in the audit trail.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::AuthGate;
use crate::channel::Command;

/// Application-level actions reachable by voice from any screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAction {
    Login,
    Signup,
    Home,
    Settings,
    Profile,
    Help,
    AddGame,
    Logout,
    CloseWindow,
    Minimize,
    Maximize,
    Exit,
}

impl GlobalAction {
    pub fn name(&self) -> &'static str {
        match self {
            GlobalAction::Login => "login",
            GlobalAction::Signup => "signup",
            GlobalAction::Home => "home",
            GlobalAction::Settings => "settings",
            GlobalAction::Profile => "profile",
            GlobalAction::Help => "help",
            GlobalAction::AddGame => "add_game",
            GlobalAction::Logout => "logout",
            GlobalAction::CloseWindow => "close_window",
            GlobalAction::Minimize => "minimize",
            GlobalAction::Maximize => "maximize",
            GlobalAction::Exit => "exit",
        }
    }

    /// Post-login actions require an authenticated session. Login, signup
    /// and window chrome stay reachable from the lock screen.
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            GlobalAction::Home
                | GlobalAction::Settings
                | GlobalAction::Profile
                | GlobalAction::Help
                | GlobalAction::AddGame
                | GlobalAction::Logout
        )
    }
}

/// Phrase synonyms, mirroring the recognizer's grammar.
const GLOBAL_PHRASES: &[(&str, GlobalAction)] = &[
    ("login", GlobalAction::Login),
    ("sign in", GlobalAction::Login),
    ("manual login", GlobalAction::Login),
    ("signup", GlobalAction::Signup),
    ("register", GlobalAction::Signup),
    ("sign up", GlobalAction::Signup),
    ("create account", GlobalAction::Signup),
    ("dashboard", GlobalAction::Home),
    ("go home", GlobalAction::Home),
    ("open dashboard", GlobalAction::Home),
    ("settings", GlobalAction::Settings),
    ("open settings", GlobalAction::Settings),
    ("go to settings", GlobalAction::Settings),
    ("profile", GlobalAction::Profile),
    ("go to profile", GlobalAction::Profile),
    ("open profile", GlobalAction::Profile),
    ("voice commands", GlobalAction::Help),
    ("help", GlobalAction::Help),
    ("show commands", GlobalAction::Help),
    ("add game", GlobalAction::AddGame),
    ("new game", GlobalAction::AddGame),
    ("logout", GlobalAction::Logout),
    ("sign out", GlobalAction::Logout),
    ("log out", GlobalAction::Logout),
    ("close", GlobalAction::CloseWindow),
    ("close window", GlobalAction::CloseWindow),
    ("minimize", GlobalAction::Minimize),
    ("maximize", GlobalAction::Maximize),
    ("exit", GlobalAction::Exit),
    ("quit", GlobalAction::Exit),
    ("close app", GlobalAction::Exit),
    ("close application", GlobalAction::Exit),
];

/// Look a normalized phrase up in the global table.
pub fn lookup_global(phrase: &str) -> Option<GlobalAction> {
    GLOBAL_PHRASES
        .iter()
        .find(|(p, _)| *p == phrase)
        .map(|(_, action)| *action)
}

/// Whether a context handler claimed a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    NotHandled,
}

/// Capability interface for screen-specific command handling.
///
/// A production handler locates a named control in its screen and
/// synthesizes the input event a direct interaction would produce; the
/// router only cares whether the command was claimed.
pub trait ContextHandler: Send {
    fn can_handle(&self, context: &str) -> bool;
    fn handle(&mut self, command: &Command) -> Outcome;
}

/// Receiver for matched global actions.
pub trait GlobalDispatch: Send {
    fn perform(&mut self, action: GlobalAction);
}

/// What routing did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The active context's handler claimed the command.
    ContextHandled,
    /// A global action was dispatched.
    Performed(GlobalAction),
    /// A protected action was blocked by the auth gate.
    Denied(GlobalAction),
    /// No handler and no table entry matched.
    Ignored,
}

pub struct CommandRouter {
    handlers: Vec<Box<dyn ContextHandler>>,
    dispatch: Box<dyn GlobalDispatch>,
    auth: Arc<AuthGate>,
}

impl CommandRouter {
    pub fn new(auth: Arc<AuthGate>, dispatch: Box<dyn GlobalDispatch>) -> Self {
        Self {
            handlers: Vec::new(),
            dispatch,
            auth,
        }
    }

    pub fn register_handler(&mut self, handler: Box<dyn ContextHandler>) {
        self.handlers.push(handler);
    }

    /// Route one command against the active context.
    pub fn route(&mut self, command: &Command, active_context: &str) -> RouteOutcome {
        if let Some(handler) = self
            .handlers
            .iter_mut()
            .find(|h| h.can_handle(active_context))
        {
            if handler.handle(command) == Outcome::Handled {
                debug!(text = %command.text, context = active_context, "handled by context");
                return RouteOutcome::ContextHandled;
            }
        }

        let Some(action) = lookup_global(&command.text) else {
            debug!(text = %command.text, "unrecognized voice command");
            return RouteOutcome::Ignored;
        };

        if action.is_protected() && !self.auth.check(action.name()) {
            warn!(action = action.name(), "voice command denied");
            return RouteOutcome::Denied(action);
        }

        self.dispatch.perform(action);
        RouteOutcome::Performed(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingDispatch(Arc<Mutex<Vec<GlobalAction>>>);

    impl GlobalDispatch for RecordingDispatch {
        fn perform(&mut self, action: GlobalAction) {
            self.0.lock().unwrap().push(action);
        }
    }

    struct ClaimingHandler {
        context: &'static str,
        claims: &'static str,
    }

    impl ContextHandler for ClaimingHandler {
        fn can_handle(&self, context: &str) -> bool {
            context == self.context
        }
        fn handle(&mut self, command: &Command) -> Outcome {
            if command.text == self.claims {
                Outcome::Handled
            } else {
                Outcome::NotHandled
            }
        }
    }

    fn router_with(
        auth: Arc<AuthGate>,
    ) -> (CommandRouter, Arc<Mutex<Vec<GlobalAction>>>) {
        let performed = Arc::new(Mutex::new(Vec::new()));
        let router = CommandRouter::new(auth, Box::new(RecordingDispatch(Arc::clone(&performed))));
        (router, performed)
    }

    fn cmd(text: &str) -> Command {
        Command::parse(text).unwrap()
    }

    #[test]
    fn test_unprotected_login_executes_while_logged_out() {
        // Scenario A: channel contains "login", auth=false.
        let auth = Arc::new(AuthGate::new());
        let (mut router, performed) = router_with(Arc::clone(&auth));

        let outcome = router.route(&cmd("login"), "login_screen");
        assert_eq!(outcome, RouteOutcome::Performed(GlobalAction::Login));
        assert_eq!(performed.lock().unwrap().as_slice(), [GlobalAction::Login]);
        // Unprotected actions never consult the gate.
        assert!(auth.audit_entries().is_empty());
    }

    #[test]
    fn test_protected_action_denied_while_logged_out() {
        // Scenario B: "go home", auth=false — handler not invoked, audit recorded.
        let auth = Arc::new(AuthGate::new());
        let (mut router, performed) = router_with(Arc::clone(&auth));

        let outcome = router.route(&cmd("go home"), "login_screen");
        assert_eq!(outcome, RouteOutcome::Denied(GlobalAction::Home));
        assert!(performed.lock().unwrap().is_empty());

        let audit = auth.audit_entries();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "home");
        assert!(!audit[0].allowed);
    }

    #[test]
    fn test_protected_action_executes_when_logged_in() {
        let auth = Arc::new(AuthGate::new());
        auth.set(true);
        let (mut router, performed) = router_with(auth);

        assert_eq!(
            router.route(&cmd("open settings"), "dashboard"),
            RouteOutcome::Performed(GlobalAction::Settings)
        );
        assert_eq!(
            performed.lock().unwrap().as_slice(),
            [GlobalAction::Settings]
        );
    }

    #[test]
    fn test_synonyms_map_to_one_action() {
        let auth = Arc::new(AuthGate::new());
        auth.set(true);
        let (mut router, performed) = router_with(auth);

        for phrase in ["exit", "quit", "close app", "close application"] {
            router.route(&cmd(phrase), "dashboard");
        }
        assert_eq!(performed.lock().unwrap().len(), 4);
        assert!(performed
            .lock()
            .unwrap()
            .iter()
            .all(|a| *a == GlobalAction::Exit));
    }

    #[test]
    fn test_context_handler_claims_before_global_table() {
        let auth = Arc::new(AuthGate::new());
        auth.set(true);
        let (mut router, performed) = router_with(auth);
        router.register_handler(Box::new(ClaimingHandler {
            context: "settings_screen",
            claims: "help",
        }));

        // Claimed by the context: the global Help action must not fire.
        assert_eq!(
            router.route(&cmd("help"), "settings_screen"),
            RouteOutcome::ContextHandled
        );
        assert!(performed.lock().unwrap().is_empty());

        // Different context: falls through to the global table.
        assert_eq!(
            router.route(&cmd("help"), "dashboard"),
            RouteOutcome::Performed(GlobalAction::Help)
        );
    }

    #[test]
    fn test_declined_command_falls_through_to_global_table() {
        let auth = Arc::new(AuthGate::new());
        auth.set(true);
        let (mut router, performed) = router_with(auth);
        router.register_handler(Box::new(ClaimingHandler {
            context: "dashboard",
            claims: "something specific",
        }));

        assert_eq!(
            router.route(&cmd("minimize"), "dashboard"),
            RouteOutcome::Performed(GlobalAction::Minimize)
        );
        assert_eq!(
            performed.lock().unwrap().as_slice(),
            [GlobalAction::Minimize]
        );
    }

    #[test]
    fn test_unrecognized_phrase_is_ignored() {
        let auth = Arc::new(AuthGate::new());
        let (mut router, performed) = router_with(auth);

        assert_eq!(
            router.route(&cmd("make me a sandwich"), "dashboard"),
            RouteOutcome::Ignored
        );
        assert!(performed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_window_chrome_is_unprotected() {
        let auth = Arc::new(AuthGate::new());
        let (mut router, performed) = router_with(auth);

        for phrase in ["close", "minimize", "maximize", "exit"] {
            router.route(&cmd(phrase), "login_screen");
        }
        assert_eq!(performed.lock().unwrap().len(), 4);
    }
}
