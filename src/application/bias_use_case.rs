// ============================================================
// Layer 2 — BiasUseCase
// ============================================================
// Builds the causal bias for one length and renders it as a
// text matrix, one row per query position. The constant is
// stored as f32, so it prints rounded to -100000000.

use anyhow::Result;
use burn::backend::NdArray;

use crate::ml::bias::autoregressive_bias;

type InspectBackend = NdArray;

pub struct BiasUseCase {
    length: usize,
}

impl BiasUseCase {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    /// Row-major bias values of the (1, length, length) tensor.
    pub fn values(&self) -> Result<Vec<f32>> {
        let bias = autoregressive_bias::<InspectBackend>(self.length, &Default::default())?;
        bias.into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read bias values: {e:?}"))
    }

    /// The bias as aligned text, e.g. for length 3:
    ///
    /// ```text
    ///           0 -100000000 -100000000
    ///           0          0 -100000000
    ///           0          0          0
    /// ```
    pub fn render(&self) -> Result<String> {
        let values = self.values()?;
        let rows: Vec<String> = values
            .chunks(self.length)
            .map(|row| {
                row.iter()
                    .map(|v| format!("{:>11.0}", v))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .collect();
        Ok(rows.join("\n"))
    }
}
