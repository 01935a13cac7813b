use std::fs;

use anyhow::{Context, Result, bail};
use xlang::layout::{self, Layout};
use xlang::{draw, lexer, parser, render};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut dump_tokens = false;
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--tokens" | "-t" => {
                dump_tokens = true;
            }
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    let Some(path) = input_path else {
        bail!("usage: xlang [--tokens] <file.x>");
    };

    print_listing(&path)?;

    if dump_tokens {
        print_tokens(&path)?;
    }

    let ast = parser::parse_file(&path).with_context(|| format!("Parsing {path}"))?;

    println!("---------------AST-------------");
    print!("{}", ast.dump());

    let counts = layout::node_counts(&ast);
    let positions = Layout::of(&ast);
    let diagram = draw::diagram(&ast, &positions, &counts);
    let image = render::render(&diagram);

    let image_path = format!("{path}.png");
    render::save_png(&image, &image_path).with_context(|| format!("Saving {image_path}"))?;

    Ok(())
}

fn print_listing(path: &str) -> Result<()> {
    let source = fs::read_to_string(path).with_context(|| format!("Reading {path}"))?;
    for (number, line) in source.lines().enumerate() {
        println!("{:3}: {line}", number + 1);
    }
    Ok(())
}

fn print_tokens(path: &str) -> Result<()> {
    let lexer = lexer::Lexer::open(path)?;
    for token in lexer {
        let token = token?;
        println!(
            "{:<12} left: {:<3} right: {:<3} line: {:<3} kind: {}",
            token.lexeme(),
            token.left,
            token.right,
            token.line,
            token.kind()
        );
    }
    Ok(())
}
