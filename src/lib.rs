//! NestEgg - Brazilian fixed-income and crypto return calculator
//!
//! This library computes gross and net returns for CDB, LCI/LCA, Tesouro
//! Direto, CDI notes, savings and Bitcoin from historical or projected
//! benchmark series, applying the regressive income tax table, IOF, crypto
//! capital gains rules and FGC deposit insurance limits.

pub mod calculator;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fgc;
pub mod investments;
pub mod rates;
pub mod tax;
pub mod utils;
