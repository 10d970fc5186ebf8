use chumsky::{prelude::*, text};

use crate::btree::BPlusKey;

/// A single shell command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // insert Key+
    Insert(Vec<BPlusKey>),

    // search Key
    Search(BPlusKey),

    // range Key Key
    Range(BPlusKey, BPlusKey),

    // scan
    Scan,

    // leaves
    Leaves,

    // levels
    Levels,

    // stats
    Stats,

    // check
    Check,

    // dump
    Dump,

    // help
    Help,

    // exit | quit
    Exit,
}

pub fn parser<'a>() -> impl Parser<'a, &'a str, Command, extra::Err<Rich<'a, char>>> {
    // Keywords and their arguments must be separated by whitespace
    let gap = text::whitespace().at_least(1);

    let key = just('-')
        .or_not()
        .then(text::int(10))
        .to_slice()
        .try_map(|s: &str, span| s.parse::<BPlusKey>().map_err(|e| Rich::custom(span, e)));

    let insert = just("insert")
        .ignore_then(
            gap.clone()
                .ignore_then(key.clone())
                .repeated()
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .map(Command::Insert);

    let search = just("search")
        .ignore_then(gap.clone())
        .ignore_then(key.clone())
        .map(Command::Search);

    let range = just("range")
        .ignore_then(gap.clone())
        .ignore_then(key.clone())
        .then_ignore(gap)
        .then(key)
        .map(|(lower, upper)| Command::Range(lower, upper));

    let scan = just("scan").to(Command::Scan);
    let leaves = just("leaves").to(Command::Leaves);
    let levels = just("levels").to(Command::Levels);
    let stats = just("stats").to(Command::Stats);
    let check = just("check").to(Command::Check);
    let dump = just("dump").to(Command::Dump);
    let help = just("help").to(Command::Help);
    let exit = choice((just("exit"), just("quit"))).to(Command::Exit);

    choice((
        insert, search, range, scan, leaves, levels, stats, check, dump, help, exit,
    ))
    .padded()
    .then_ignore(end())
}
