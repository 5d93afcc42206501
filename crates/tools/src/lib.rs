pub mod pano;
