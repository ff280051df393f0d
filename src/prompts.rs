//! Fixed system directives sent to the hosted model.
//!
//! Keeping every prompt here means a wording change touches exactly one place,
//! and unit tests can assert on the directives without a live model.

/// Directives for extracting invoice line items, in the order they are sent.
///
/// Each following user message carries the OCR text of one invoice page.
pub const INVOICE_DIRECTIVES: [&str; 3] = [
    "You will get a list of strings as an input where each element in the list \
represents text extracted from a pdf invoice. Your task is to extract line items \
from the text list in json format. Each object inside the JSON array should \
include key called item which is the name of the item, expiry_date which is the \
expiry date in ISO format if exists, lot_no which is the lot number of the item \
if exists, and quantity which is the number of items for that line item.",
    "This strings you will get as input are extracted from a PDF file using OCR so \
there might be some mistakes in recognizing characters or spelling mistakes, \
correct those mistakes if you find them.",
    STRICT_JSON_DIRECTIVE,
];

/// Directives for extracting a batch number from a vial-label photo.
pub const BATCH_NUMBER_DIRECTIVES: [&str; 2] = [
    "Your input will be a string that is extracted from an image of a medication \
vial that has a batch number on it. Your task is to extract the batch number from \
the string and return it in a JSON object with a key called batch_number. If you \
can't find the batch number, return an empty string.",
    STRICT_JSON_DIRECTIVE,
];

/// Final directive shared by both extractions.
pub const STRICT_JSON_DIRECTIVE: &str =
    "Your output should strictly be a valid JSON object and nothing else";
