//! Built-in demo survey, analysed when the submitted text is blank.

/// Tab-separated `id, text, stakeholder` lines.
pub const SAMPLE_RESPONSES: &str = "\
4821\tI think the teachers are doing a great job overall. My child feels encouraged and supported.\tstudents\n\
9134\tCommunication with parents has improved, but sometimes notices come too late. A bit more lead time would really help.\tparents\n\
2750\tMore extracurricular activities would be great.\tstudents\n\
6042\tWe’ve been happy with the teaching staff this year. Thank you for all the hard work.\tparents\n\
8329\tThe new playground equipment is a hit with the kids.\tstudents\n\
1275\tHomework expectations sometimes feel too heavy, especially for younger grades.\tparents\n\
5460\tThank you for always putting student wellbeing first.\tstaff\n\
3098\tI’d love to see more cultural events celebrated.\tparents\n\
7684\tThe school office staff are always helpful and friendly.\tparents\n\
4119\tDrop-off and pick-up traffic flow could be improved. It’s often chaotic and stressful.\tparents\n\
9097\tReally appreciate the dedication of the teachers.\tstudents\n\
6732\tTechnology in the classrooms has been a great addition.\tstaff\n\
2485\tMore feedback on student progress would be helpful. Sometimes I’m not sure how my child is tracking.\tparents\n\
5826\tMy child feels safe and supported at school.\tparents\n\
1509\tUniform options could be a bit more flexible. Some kids find them uncomfortable.\tstudents\n\
3372\tThank you for organizing the recent school fair. It was a fantastic community event.\tparents\n\
8240\tWould like to see more sports opportunities.\tstudents\n\
9953\tThe principal is very approachable, which we value.\tparents\n\
4561\tGreat sense of community in the school.\tstaff\n\
7729\tMy child has grown in confidence this year.\tparents\n\
6834\tMore focus on creative arts would be appreciated.\tstudents\n\
5912\tSchool communication apps are easy to use.\tparents\n\
3207\tExcursions have been very educational this year.\tstudents\n\
8471\tI think the canteen menu could be healthier. Some of the current options aren’t great.\tparents\n\
4290\tReally happy with the literacy program.\tstudents\n\
7075\tTeachers are very responsive to questions.\tparents\n\
3891\tMy child looks forward to going to school every day. That speaks volumes.\tparents\n\
2164\tWould like more parent workshops offered.\tparents\n\
9442\tThank you for supporting children with additional needs. It makes a huge difference.\tparents\n\
5053\tFeedback on assignments has been constructive.\tstudents\n\
3716\tWould like better shade in the playground.\tstudents\n\
8190\tSchool concerts are always a highlight. They bring everyone together.\tparents\n\
2746\tMore outdoor learning opportunities would be nice.\tstaff\n\
6805\tReally value the emphasis on respect and kindness.\tparents\n\
4827\tSchool reports are clear and helpful.\tparents\n\
9950\tTransition programs have helped my child a lot. The buddy system in particular is wonderful.\tparents\n\
6438\tStaff turnover seems high, which is a bit concerning. Stability would benefit the students.\tstaff\n\
1279\tVery impressed with the science resources.\tstudents\n\
3480\tMore consistent updates about classroom activities would help.\tparents\n\
7215\tMy child feels encouraged to do their best.\tparents\n\
5583\tParent–teacher meetings were very useful. I appreciate the time teachers take to prepare.\tparents\n\
8024\tWould like to see more clubs for different interests.\tstudents\n\
6697\tDiscipline is handled fairly and respectfully.\tparents\n\
1376\tSchool library is fantastic—my child loves it.\tparents\n\
7301\tHomework policy could be reviewed. Sometimes it feels excessive.\tparents\n\
2155\tTeachers show genuine care for the students.\tstudents\n\
9043\tMore focus on environmental initiatives would be great.\tstaff\n\
5990\tVery happy with the school overall.\tparents\n\
8634\tWould like more updates on curriculum changes.\tparents\n\
4728\tExcited to see the improvements in facilities.\tstaff\n\
1832\tMy child has developed strong friendships here. That sense of belonging is priceless.\tparents\n\
6340\tWould like a wider range of lunch options.\tstudents\n\
7519\tReally appreciate the safe and welcoming environment.\tparents\n\
2893\tStaff seem stretched thin at times. It worries me about long-term sustainability.\tstaff\n\
9312\tCommunication about upcoming events could improve. Sometimes reminders are too close to the date.\tparents\n\
5607\tMy child enjoys the music program a lot.\tstudents\n\
4485\tThank you for supporting student leadership opportunities.\tstaff\n\
8226\tWould like to see more languages offered.\tparents\n\
3160\tTeachers are approachable and supportive.\tstudents\n\
1098\tSchool newsletters are informative and easy to read.\tparents\n\
4759\tReally impressed with the math support program.\tstudents\n\
8245\tMy child feels confident in their learning.\tparents\n\
2694\tSome classrooms could use updated furniture. Desks and chairs are worn out.\tstaff\n\
9511\tThank you for involving parents in school life.\tparents\n\
3027\tMore STEM activities would be appreciated.\tstudents\n\
7680\tStaff handle concerns quickly and respectfully.\tparents\n\
1936\tMy child feels included and valued.\tparents\n\
8442\tSchool excursions have been well planned.\tstudents\n\
4250\tMore after-school care options would help families.\tparents\n\
9768\tReally like the buddy program for new students.\tparents\n\
5114\tMy child feels motivated to learn.\tstudents\n\
7349\tCommunication during emergencies has been excellent.\tparents\n\
2597\tSchool grounds are well maintained.\tstaff\n\
8705\tWould like more sports for younger grades.\tparents\n\
3351\tTeachers are great role models.\tstudents\n\
9458\tStudents are encouraged to be respectful.\tstaff\n\
6802\tWould like to see more project-based learning.\tstudents\n\
5327\tSchool staff are very approachable.\tparents\n\
1149\tReally impressed with the digital learning platforms.\tstaff\n\
3910\tMy child feels supported academically.\tparents\n\
7864\tSchool assemblies are a great way to build community.\tstaff\n\
2502\tWould like to see more parent input opportunities.\tparents\n\
6097\tReally appreciate the open communication channels.\tparents\n\
9220\tMore shaded outdoor areas would be useful.\tstudents\n\
3345\tTeachers encourage creativity in students.\tstaff\n\
8217\tWould like more emphasis on physical fitness.\tparents\n\
4579\tVery satisfied with the overall direction of the school.\tparents\n\
7281\tMy child feels challenged in their learning.\tparents\n\
6823\tTeachers explain things clearly and patiently.\tstudents\n\
5160\tMore school-wide celebrations would be nice.\tstaff\n\
2495\tReally value the emphasis on kindness and respect.\tparents\n\
9130\tMy child has developed resilience at this school.\tparents\n\
6708\tCommunication between teachers and parents is strong.\tparents\n\
2843\tWould like to see more career guidance for older students. It would help them plan ahead.\tstudents\n\
7596\tTeachers go above and beyond to support learning.\tstaff\n\
4321\tVery happy with how conflicts are resolved.\tparents\n\
1488\tSchool feels like a welcoming community.\tstudents\n\
5726\tWould like more excursions related to science and history.\tstudents\n\
6402\tReally appreciate the wellbeing programs. They’ve made a real difference to my child.\tparents\n\
8173\tMy child feels proud to be part of this school.\tparents\n\
2608\tThank you for making learning fun and engaging.\tstudents\n\
9991\tOverall, a very positive experience for our family.\tparents";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::parse_responses;

    #[test]
    fn test_sample_parses_cleanly() {
        let (responses, report) = parse_responses(SAMPLE_RESPONSES).unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(responses.len(), 102);
        assert!(responses.iter().all(|r| ["parents", "staff", "students"].contains(&r.stakeholder.as_str())));
    }
}
