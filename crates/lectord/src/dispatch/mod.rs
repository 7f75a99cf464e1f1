//! JSONL request dispatch.
//!
//! Callers send one JSON object per line:
//!
//! ```json
//! {"cmd":"ocr","image_path":"/tmp/capture.png","id":7}
//! ```
//!
//! and receive one response line per request, except for `shutdown`:
//!
//! ```json
//! {"status":"ok","results":[{"text":"…","confidence":0.97,"bbox":[12,8,140,22],"polygon":[[12,8],[152,8],[152,30],[12,30]]}],"id":7}
//! ```
//!
//! Failures of any kind produce `{"status":"error","error":"…"}` with the
//! caller's `id` echoed when one was supplied.

mod errors;
mod request;
mod response;
mod router;

pub use self::errors::{DispatchError, MalformedLine, ValidationError};
pub use self::request::{Command, OcrRequest, Request, decode_line};
pub use self::response::{Response, ResponseWriteError, ResponseWriter, Status};
pub use self::router::{Dispatcher, Outcome};
