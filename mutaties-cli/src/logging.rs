use mutaties::colors::MaybeColorize;

pub fn created(something: impl ToString) {
    eprintln!("{} {}", "created".green(), something.to_string());
}

pub fn reused(something: impl ToString) {
    eprintln!("{} {}", "reused".yellow(), something.to_string());
}

pub fn processed(something: impl ToString) {
    eprintln!("{} {}", "processed".green(), something.to_string());
}

pub fn pending(something: impl ToString) {
    eprintln!("{} {}", "pending".yellow(), something.to_string());
}

pub fn error(something: impl ToString) {
    eprintln!("{}: {}", "error".red(), something.to_string());
}
