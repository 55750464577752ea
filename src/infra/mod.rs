// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that touch the file system:
//
//   config_store.rs — saving and loading the TransformerConfig
//                     as JSON, validated on the way in and out
//
// Reference: Rust Book §9 (Error Handling with anyhow)

/// Transformer config persistence
pub mod config_store;
