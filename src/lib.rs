//! Edge-adaptive image steganography.
//!
//! Hides a byte payload in the low bits of edge pixels selected by Sobel
//! edge detection and density clustering, spending two bits per channel on
//! textured pixels and one elsewhere. Provides a command line interface on
//! top of the [`stego`] core.
pub mod cli;
pub mod config;
pub mod stego;
