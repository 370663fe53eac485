/**
 * This module contains all logic for reading texture images from external files.
 */
pub mod texture;
