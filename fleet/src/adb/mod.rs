mod device;
mod input;
mod keys;
mod packages;
mod power;
mod props;
mod quirks;
mod shell;

pub use device::*;
pub use input::*;
pub use keys::*;
pub use packages::*;
pub use power::*;
pub use props::*;
pub use quirks::*;
pub use shell::*;
