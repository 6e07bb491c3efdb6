pub mod columns;
pub mod controller;
pub mod domain;
pub mod filter;
pub mod inputter;
pub mod model;
pub mod record;
pub mod sort;
pub mod ui;
pub mod view;
