//! Demo showcasing page parsing and reply hierarchy reconstruction.

use forum_thread_lib_rs::feed::Feed;
use forum_thread_lib_rs::threading::{ExclusionReason, Hierarchy};

fn main() {
    // Two pages of a thread; the second one repeats a post from the first
    let page_one = r#"<html><body><table summary="posts">
<tr><td class="bold l pu"><a class="user" href="/seun">seun</a>: <span class="s"><b>9:38pm</b> On <b>Aug 10</b></span></td></tr>
<tr><td id="pb100"><div class="narrow">Welcome to the live thread <img alt="smile" src="/faces/smile.gif"></div>
<p class="s"><b id="lpt100">12 Likes</b> <b id="shb100">2 Shares</b></p></td></tr>
<tr><td class="bold l pu"><a class="user" href="/ada">ada</a>: <span class="s"><b>9:40pm</b></span></td></tr>
<tr><td id="pb101"><div class="narrow"><blockquote><a href="/post/100">seun</a>: Welcome</blockquote>Thanks &amp; hello!</div></td></tr>
</table></body></html>"#;

    let page_two = r#"<html><body><table summary="posts">
<tr><td id="pb101"><div class="narrow">re-scraped copy</div></td></tr>
<tr><td class="bold l pu"><a class="user" href="/tobi">tobi</a></td></tr>
<tr><td id="pb102"><div class="narrow"><b>post=101</b> You're welcome</div></td></tr>
<tr><td id="pb103"><div class="narrow"><a href="/post/55">old</a> replying to an older page</div></td></tr>
</table></body></html>"#;

    let feed = Feed::from_pages(&[page_one, page_two]);

    println!("=== Feed ===");
    println!("Posts: {}", feed.len());
    println!("Duplicates dropped: {}", feed.duplicates_dropped());

    println!("\n=== Parsed Posts ===");
    for post in feed.posts() {
        println!(
            "#{} by {} at {} (reply to {:?}, {} likes, {} shares): {}",
            post.id(),
            post.username(),
            post.timestamp(),
            post.reply_to(),
            post.likes(),
            post.shares(),
            post.content()
        );
    }

    let mut hierarchy = Hierarchy::from(&feed);
    if let Err(e) = hierarchy.check_integrity() {
        eprintln!("Warning: {e}");
    }
    hierarchy.retain_non_empty();

    println!("\n=== Excluded Posts ===");
    for exclusion in hierarchy.excluded() {
        match exclusion.reason {
            ExclusionReason::DanglingParent { missing_ancestor } => println!(
                "#{} (post {missing_ancestor} was never scraped)",
                exclusion.post_id
            ),
            ExclusionReason::ReplyCycle { anchor } => println!(
                "#{} (reply loop through post {anchor})",
                exclusion.post_id
            ),
        }
    }

    println!("\n=== Reading View ===");
    print!("{hierarchy}");
}
