use std::error;
use std::fmt::{self, Display};

use postgres::Client;


/// The error type migration bodies report failures with. Any database driver error converts into
/// it through `?`.
pub type BoxError = Box<dyn error::Error + Send + Sync>;

/// A single, ordered schema or data change. The `Display` implementation must produce the
/// migration's name (e.g. "20240110093000_create_users_table"); that name is what the ledger
/// records and what determines execution order.
///
/// `C` is the connection handle the migration runs against. It is passed explicitly to both
/// directions so a migration never reaches for a shared global connection.
pub trait Migration<C: ?Sized = Client> : Display {
    /// Applies this migration.
    fn up(&self, connection: &mut C) -> Result<(), BoxError>;
    /// Undoes this migration.
    fn down(&self, connection: &mut C) -> Result<(), BoxError>;
}

/// Which half of a migration was running.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Direction {
    Up,
    Down,
}
impl Display for Direction {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Direction::Up => write!(formatter, "up"),
            Direction::Down => write!(formatter, "down"),
        }
    }
}
