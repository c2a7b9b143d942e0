mod common;
mod test_pipeline;
