/// Checks that `number` is a non-empty string of ASCII digits with a valid Luhn check digit.
///
/// Starting from the rightmost digit (the check digit), every second digit is doubled, and 9 is subtracted from any
/// doubled value above 9. The number is valid when the sum of all digits is divisible by 10.
pub fn is_luhn_valid(number: &str) -> bool {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let sum = number.bytes().rev().enumerate().fold(0u32, |sum, (i, b)| {
        let digit = u32::from(b - b'0');
        let digit = if i % 2 == 1 {
            let doubled = digit * 2;
            if doubled > 9 {
                doubled - 9
            } else {
                doubled
            }
        } else {
            digit
        };
        sum + digit
    });
    sum % 10 == 0
}
