//! Operator-facing banners.

/// Upper-case the headline; any listing after it is printed as given.
fn shout(message: &str) -> String {
    match message.split_once('\n') {
        Some((headline, rest)) => format!("{}\n{}", headline.to_uppercase(), rest),
        None => message.to_uppercase(),
    }
}

pub fn info(message: &str) {
    println!("\n{}", "=-".repeat(40));
    println!("{}", shout(message));
}

pub fn warning(message: &str) {
    println!("\n{}", "?".repeat(80));
    println!("{}", shout(message));
}

pub fn error(message: &str) {
    eprintln!("\n{}", "!".repeat(80));
    eprintln!("{}", shout(message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn only_the_headline_is_upper_cased() {
        let err = Error::dirty_working_tree(vec![
            " M app/models/user.rb".to_string(),
            "?? tmp/notes.txt".to_string(),
        ]);

        assert_eq!(
            shout(&err.message),
            "WORKING DIRECTORY HAS UNCOMMITTED CHANGES:\n M app/models/user.rb\n?? tmp/notes.txt"
        );
    }

    #[test]
    fn single_line_messages_are_upper_cased() {
        assert_eq!(shout("Deploying to staging"), "DEPLOYING TO STAGING");
    }
}
