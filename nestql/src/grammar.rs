use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "nestql.pest"]
pub struct NestqlParser;
