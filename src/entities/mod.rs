// Entity Models
//
// Each entity has a stable UUID identity and belongs to exactly one owner.
// Row mapping lives beside the struct; store operations live in the
// component modules (taxonomy, recipients, payments).

pub mod owner;
pub mod dimension;
pub mod tag;
pub mod recipient;
pub mod payment_item;

pub use owner::{Owner, OwnerDefaults};
pub use dimension::Dimension;
pub use tag::{NewTagNode, TagNode, TagNodeUpdate, TagTree};
pub use recipient::{Recipient, RecipientUpdate};
pub use payment_item::{NewPaymentItem, PaymentFilter, PaymentItem, PaymentItemUpdate};

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
