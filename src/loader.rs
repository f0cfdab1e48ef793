use crate::error::AcResult;
use crate::space::{ParameterBound, ParameterSpace};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Reads `name,min,max[,component]` rows (header required) into a space.
///
/// Rows keep file order. Whitespace around fields is trimmed and an empty
/// component cell means "no component".
pub fn load_bounds<R: Read>(reader: R) -> AcResult<ParameterSpace> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut bounds = Vec::new();
    for (row_idx, result) in rdr.deserialize::<ParameterBound>().enumerate() {
        let bound = result?;
        debug!(row = row_idx + 1, name = %bound.name, min = bound.min, max = bound.max, "bound");
        bounds.push(bound);
    }

    ParameterSpace::new(bounds)
}

pub fn load_bounds_from_file<P: AsRef<Path>>(path: P) -> AcResult<ParameterSpace> {
    let path = path.as_ref();
    info!("Loading parameter bounds from {:?}", path);
    let file = File::open(path)?;
    load_bounds(file)
}
