use crate::color::{Color, OrderKey};

/// Errors raised while extracting, pairing or applying palettes.
///
/// Every variant is a deterministic function of the input; none of them is
/// worth retrying without changing the arguments.
#[derive(Debug, thiserror::Error)]
pub enum PaletteError {
    /// Two distinct colours that survived the count threshold rank equally,
    /// so the palette order would be arbitrary.
    #[error(
        "Multiple colours in layer with same {order_key} ({key_display}): \
         {first} ({first_count} pixels) and {second} ({second_count} pixels). \
         Cannot automatically sort colours by {order_key}. \
         Try increasing the count threshold to drop stray pixels."
    )]
    AmbiguousOrdering {
        order_key: OrderKey,
        key: u32,
        key_display: String,
        first: Color,
        first_count: u32,
        second: Color,
        second_count: u32,
    },

    /// A palette strip is not 1 pixel tall, or two strips that must line up
    /// 1:1 have different lengths.
    #[error("palette shape error: {0}")]
    PaletteShape(String),

    /// Degenerate input such as an empty layer.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An unknown layer handle was passed to a document operation.
    #[error("no layer with id {0}")]
    UnknownLayer(usize),

    /// Decoding or encoding an image failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
