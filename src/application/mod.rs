// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each:
//
//   forward_use_case.rs — build encoder and decoder stacks from a
//                         config and push a random batch through
//   bias_use_case.rs    — render the causal bias for a length
//
// Rules for this layer:
//   - No tensor math here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

/// Random-batch forward pass through both stacks
pub mod forward_use_case;

/// Causal bias rendering
pub mod bias_use_case;
