//! FM tuner driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in aerial-core for tuner hardware:
//!
//! - TEA5767 FM stereo radio (I2C, blocking and async)

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod tuner;
