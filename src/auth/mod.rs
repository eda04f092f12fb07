// Authentication module
// Manages credential persistence, token lifecycle and login

mod credentials;
mod login;
mod manager;
mod refresh;
mod types;

pub use credentials::{default_token_path, load_from_file, save_to_file, TOKEN_FILE_NAME};
pub use login::LoginClient;
pub use manager::{TokenManager, FRESHNESS_WINDOW_SECS, REFRESH_TIMEOUT};
pub use refresh::{HttpRefreshTransport, RefreshTransport};
pub use types::{token_prefix, Credential, TokenPair};
