//! Insn operands with a meaning to the writers.

/// `shift` direction.
pub const LEFT: &str = "left";

/// A shared register write that also pulses the register's notifier.
pub const NOTIFY: &str = "notify";
/// A shared register read that waits for the next notification.
pub const WAIT_NOTIFY: &str = "wait_notify";
/// A shared register write that waits until the mailbox is empty and fills it.
pub const PUT_MAILBOX: &str = "put_mailbox";
/// A shared register read that waits until the mailbox is full and empties it.
pub const GET_MAILBOX: &str = "get_mailbox";
