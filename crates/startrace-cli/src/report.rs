//! The fixed sample query sequence and its plain-text report.

use crate::dataset::LanguageNames;
use anyhow::{Context, Result};
use startrace_query::facade::{
    decode_bitmap, decode_changed, decode_top_n, execute, fetch_bitmap, set_bit, top_n,
};
use startrace_query::{BitSet, CountItem, Query, Transport};
use std::io::Write;

pub const INDEX: &str = "repository";
pub const STARGAZER: &str = "stargazer";
pub const LANGUAGE: &str = "language";

pub fn run_queries<T: Transport + ?Sized>(
    client: &T,
    languages: &LanguageNames,
    out: &mut impl Write,
) -> Result<()> {
    let schema = client.schema().context("failed to load schema")?;
    let repository = schema.index(INDEX)?;
    let stargazer = repository.collection(STARGAZER)?;
    let language = repository.collection(LANGUAGE)?;

    let starred = bitmap(client, &fetch_bitmap(&stargazer, 14))?;
    writeln!(out, "User 14 starred:")?;
    print_ids(out, &starred)?;
    writeln!(out)?;

    let top = decode_top_n(&execute(client, &top_n(&language, 5))?)?;
    writeln!(out, "Top Languages:")?;
    print_top_languages(out, &top, languages)?;
    writeln!(out)?;

    let both =
        repository.intersect([fetch_bitmap(&stargazer, 14), fetch_bitmap(&stargazer, 19)])?;
    writeln!(out, "Both user 14 and 19 starred:")?;
    print_ids(out, &bitmap(client, &both)?)?;
    writeln!(out)?;

    let either =
        repository.union([fetch_bitmap(&stargazer, 14), fetch_bitmap(&stargazer, 19)])?;
    writeln!(out, "User 14 or 19 starred:")?;
    print_ids(out, &bitmap(client, &either)?)?;
    writeln!(out)?;

    let in_language = repository.intersect([either, fetch_bitmap(&language, 1)])?;
    writeln!(out, "User 14 or 19 starred, written in language 1:")?;
    print_ids(out, &bitmap(client, &in_language)?)?;
    writeln!(out)?;

    let changed = decode_changed(&execute(client, &set_bit(&stargazer, 99999, 77777))?)?;
    tracing::debug!(changed, "set stargazer bit");
    writeln!(out, "Set user 99999 as a stargazer for repository 77777")?;
    writeln!(out)?;

    Ok(())
}

fn bitmap<T: Transport + ?Sized>(client: &T, query: &Query) -> Result<BitSet> {
    Ok(decode_bitmap(&execute(client, query)?)?)
}

fn print_ids(out: &mut impl Write, ids: &BitSet) -> Result<()> {
    for (i, id) in ids.iter().enumerate() {
        writeln!(out, "\t{}. {}", i + 1, id)?;
    }
    Ok(())
}

fn print_top_languages(
    out: &mut impl Write,
    items: &[CountItem],
    languages: &LanguageNames,
) -> Result<()> {
    for (i, item) in items.iter().enumerate() {
        writeln!(
            out,
            "\t{}. {} ({} stars)",
            i + 1,
            languages.label(item.id),
            item.count
        )?;
    }
    Ok(())
}
