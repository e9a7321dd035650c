pub mod pull;
pub mod push;

mod run;
