//! Report channel between the supervisor and the supervised program.
//!
//! # Architecture
//!
//! ```text
//! Child (Reporter)                 Supervisor (ReportServer)
//!     |                                  |
//!     |-- add-paths (initial) ---------->| (filter, watch)
//!     |-- add-paths ------------------->|
//!     |                                  |
//!     x exit: write report file          |
//!                                        | (read + delete report file)
//! ```
//!
//! # Protocol
//!
//! Communication uses JSON-line format over a Unix domain socket whose path
//! is passed in [`SOCKET_ENV`]. The only message is
//! `{"type":"add-paths","paths":[...],"initial":bool}`; anything else is
//! ignored. On exit the child writes a JSON array of paths to the file named
//! in [`REPORT_FILE_ENV`].
//!
//! # Example
//!
//! ```no_run
//! use hotwire::ipc::Reporter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reporter = Reporter::from_env();
//!
//! reporter.report_paths(["src/app.rs", "config/app.toml"]).await?;
//! // ... later, on exit:
//! reporter.write_report_file()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod report_file;
pub mod server;
pub mod types;

pub use client::Reporter;
pub use report_file::{take_report_file, write_report_file, ReportFileError};
pub use server::{ReportServer, ServerHandle};
pub use types::{ChildMessage, IpcError};

/// Environment variable carrying the report socket path.
pub const SOCKET_ENV: &str = "HOTWIRE_IPC_SOCKET";

/// Environment variable carrying the crash-safe report file path.
pub const REPORT_FILE_ENV: &str = "HOTWIRE_REPORT_FILE";
