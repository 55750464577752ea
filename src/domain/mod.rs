// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe what a transformer block is
// made of, with no tensor framework in sight:
//
//   process_step.rs — the `n` / `r` / `d` processing mini-language
//                     resolved into an ordered list of steps
//   bias.rs         — the values of the causal (autoregressive)
//                     attention bias, as a flat row-major table
//   error.rs        — the error taxonomy shared by every block
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and functions
//
// Reference: Rust Book §6 (Enums), §9 (Error Handling)

/// Pre/post-process step parsing
pub mod process_step;

/// Autoregressive bias values
pub mod bias;

/// Block error type
pub mod error;
