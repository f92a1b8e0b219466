pub mod add;
pub mod count;
pub mod init;
pub mod list;
pub mod show;
