mod client;

pub use client::{
    ImageAsset, PinningClient, UploadError, PLACEHOLDER_IMAGE_CID, PLACEHOLDER_METADATA_CID,
};
