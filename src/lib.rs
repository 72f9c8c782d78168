//! Filter-and-aggregate pipeline behind the bike-sharing dashboard.
//!
//! Load a dataset once with [`data::loader::load_file`], hand it to a
//! [`state::DashboardState`], adjust its [`data::filter::FilterSpec`] and
//! build chart-ready summaries with [`charts::build_dashboard`].

pub mod charts;
pub mod color;
pub mod data;
pub mod render;
pub mod state;
