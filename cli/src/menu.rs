use std::io::{BufRead, Write};

use color_eyre::Result;

use crate::cli::Command;

pub const MENU: &str = indoc::indoc! {"

    What would you like to do?
    1. Generate test image
    2. Generate all workshop images
    3. Both (test first, then all images)
"};

pub fn parse_choice(input: &str) -> Option<Command> {
    match input.trim() {
        "1" => Some(Command::Test),
        "2" => Some(Command::Batch),
        "3" => Some(Command::Both { yes: false }),
        _ => None,
    }
}

/// Shows the menu and reads one line. `None` means the answer wasn't a valid choice.
pub fn ask_command(input: &mut impl BufRead, output: &mut impl Write) -> Result<Option<Command>> {
    write!(output, "{MENU}\nEnter your choice (1-3): ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(parse_choice(&line))
}

pub fn wait_for_enter(input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
    write!(output, "Press Enter to continue with full generation...")?;
    output.flush()?;
    input.read_line(&mut String::new())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn choices() {
        assert_eq!(parse_choice("1"), Some(Command::Test));
        assert_eq!(parse_choice(" 2\n"), Some(Command::Batch));
        assert_eq!(parse_choice("3"), Some(Command::Both { yes: false }));
        for invalid in ["", "0", "4", "one", "1 2"] {
            assert_eq!(parse_choice(invalid), None, "{invalid:?}");
        }
    }

    #[test]
    fn asks_once() -> Result<()> {
        let mut input = Cursor::new("2\n1\n");
        let mut output = Vec::new();

        assert_eq!(ask_command(&mut input, &mut output)?, Some(Command::Batch));
        let shown = String::from_utf8(output)?;
        assert!(shown.contains("3. Both (test first, then all images)"));
        assert!(shown.ends_with("Enter your choice (1-3): "));
        Ok(())
    }

    #[test]
    fn closed_input_is_invalid() -> Result<()> {
        let mut input = Cursor::new("");
        assert_eq!(ask_command(&mut input, &mut Vec::<u8>::new())?, None);
        Ok(())
    }
}
