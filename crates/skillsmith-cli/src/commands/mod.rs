pub mod compare;
pub mod init;
pub mod list;
pub mod publish;
pub mod recommend;
pub mod remove;
pub mod search;
pub mod sync;
pub mod validate;
