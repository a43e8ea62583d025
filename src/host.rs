//! Surface exposed by the embedding host application.
//!
//! The host owns the launch parameter and the authentication token, and
//! provides the only two UI primitives the core needs: a blocking alert and
//! closing the session.

/// Collaborator implemented by whatever embeds the client.
pub trait Host: Send + Sync {
    /// Opaque launch string, if the session was opened through a link.
    fn launch_param(&self) -> Option<String>;

    /// Authentication token attached to every request.
    fn auth_token(&self) -> String;

    /// Show a blocking alert to the user.
    fn show_alert(&self, message: &str);

    /// Close the session.
    fn close(&self);
}
