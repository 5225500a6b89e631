/* 📖 # What is the Platform Abstraction Layer?

The PAL is the only way the rest of lectern touches the machine: reading book files,
listing the books directory and running the HTTP server. `RealPal` does this for real,
`MockPal` keeps files and servers in memory so engine tests never touch the disk or a socket.
*/

mod file_path;
pub mod http;
pub mod mock;
pub mod real_pal;
mod traits;

pub use file_path::FilePath;
pub use mock::MockPal;
pub use real_pal::RealPal;
pub use traits::{Pal, PalHandle};
