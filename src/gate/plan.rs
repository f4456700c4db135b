//! Pure routing rules of the gate.
//!
//! Rules, first match wins:
//! 1. signed-in user on an auth-only path → landing path
//! 2. guest on home or notes → login, with `next` set to the original target
//! 3. signed-in user on home or notes without a note id → attach a note
//! 4. signed-in user on home with a note id → notes path, query kept
//! 5. anything else passes through

use url::form_urlencoded;

use crate::auth::AuthenticatedUser;
use crate::config::GateRulesConfig;

/// What the gate does with one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatePlan<'a> {
    /// Forward to the upstream unchanged.
    PassThrough,
    /// Signed-in user hit an auth-only path.
    RedirectToLanding(String),
    /// Guest hit a gated path.
    RedirectToLogin(String),
    /// Look up (or create) a note, then redirect to it.
    AttachNote(&'a AuthenticatedUser),
    /// Signed-in user on the home path.
    Canonicalize(String),
}

impl GatePlan<'_> {
    /// Label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            GatePlan::PassThrough => "pass_through",
            GatePlan::RedirectToLanding(_) => "redirect_landing",
            GatePlan::RedirectToLogin(_) => "redirect_login",
            GatePlan::AttachNote(_) => "attach_note",
            GatePlan::Canonicalize(_) => "canonicalize",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GateRules {
    config: GateRulesConfig,
}

impl GateRules {
    pub fn new(config: GateRulesConfig) -> Self {
        Self { config }
    }

    pub fn plan<'a>(&self, path: &str, query: Option<&str>, user: Option<&'a AuthenticatedUser>) -> GatePlan<'a> {
        let query = query.filter(|q| !q.is_empty());
        let cfg = &self.config;

        if user.is_some() && cfg.auth_paths.iter().any(|p| p == path) {
            return GatePlan::RedirectToLanding(cfg.notes_path.clone());
        }

        let is_home = path == cfg.home_path;
        if !is_home && path != cfg.notes_path {
            return GatePlan::PassThrough;
        }

        match user {
            None => GatePlan::RedirectToLogin(self.login_location(path, query)),
            Some(user) if !has_param(query, &cfg.note_param) => GatePlan::AttachNote(user),
            Some(_) if is_home => GatePlan::Canonicalize(self.canonical_location(query)),
            Some(_) => GatePlan::PassThrough,
        }
    }

    /// `/login?next=<path?query>`
    pub fn login_location(&self, path: &str, query: Option<&str>) -> String {
        let next = match query {
            Some(q) => format!("{}?{}", path, q),
            None => path.to_string(),
        };
        let encoded = form_urlencoded::Serializer::new(String::new())
            .append_pair(&self.config.next_param, &next)
            .finish();
        format!("{}?{}", self.config.login_path, encoded)
    }

    /// `/notes?noteId=<id>`
    pub fn note_location(&self, note_id: &str) -> String {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .append_pair(&self.config.note_param, note_id)
            .finish();
        format!("{}?{}", self.config.notes_path, encoded)
    }

    /// Notes path with the original query verbatim.
    pub fn canonical_location(&self, query: Option<&str>) -> String {
        match query {
            Some(q) => format!("{}?{}", self.config.notes_path, q),
            None => self.config.notes_path.clone(),
        }
    }
}

fn has_param(query: Option<&str>, name: &str) -> bool {
    query
        .map(|q| form_urlencoded::parse(q.as_bytes()).any(|(key, _)| key == name))
        .unwrap_or(false)
}
