// Field limits and seeded names shared by single-entity and bulk paths.

pub const MAX_DESCRIPTION_LENGTH: usize = 1000;
pub const MAX_RECIPIENT_NAME_LENGTH: usize = 255;
pub const MAX_RECIPIENT_ADDRESS_LENGTH: usize = 500;
pub const MAX_CATEGORY_NAME_LENGTH: usize = 255;

/// Name of the distinguished dimension every owner is provisioned with
pub const STANDARD_DIMENSION_NAME: &str = "standard";
pub const STANDARD_DIMENSION_DESCRIPTION: &str =
    "Default category type for basic expense/income classification";

/// Root tag in the standard dimension used when a tag set is reset
pub const UNCLASSIFIED_TAG_NAME: &str = "UNCLASSIFIED";

pub const IMPORT_DELIMITER: u8 = b';';

pub const IMPORT_HEADER: [&str; 7] = [
    "amount",
    "date",
    "description",
    "recipient_name",
    "recipient_address",
    "tag_name",
    "periodic",
];
