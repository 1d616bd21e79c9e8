pub mod config;
pub mod dispatcher;
pub mod git_setup;
pub mod job;
pub mod lockfile;
pub mod model;
pub mod pipeline;
pub mod publish;
pub mod remote;
pub mod workdir;
